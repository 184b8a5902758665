//! Spherical Web Mercator (EPSG:3857) and planar measurements.
//!
//! Length shares and boundary distances are measured in projected metres,
//! so the overlay works on Mercator copies of the geometry while the state
//! itself stays in WGS-84.

use std::f64::consts::FRAC_PI_4;

use geo::{Coord, LineString, MapCoords, MultiPolygon};

/// Semi-major axis used by EPSG:3857.
pub const MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Latitude at which the projection becomes square.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Project a WGS-84 coordinate (x = lon, y = lat) to Web Mercator metres.
#[inline]
pub fn to_web_mercator(c: Coord) -> Coord {
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    Coord {
        x: MERCATOR_RADIUS_M * c.x.to_radians(),
        y: MERCATOR_RADIUS_M * (FRAC_PI_4 + lat * 0.5).tan().ln(),
    }
}

pub fn project_line(line: &LineString<f64>) -> LineString<f64> {
    line.map_coords(to_web_mercator)
}

pub fn project_multi_polygon(polygon: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    polygon.map_coords(to_web_mercator)
}

/// Euclidean length of a line in its own units.
pub fn planar_length(line: &LineString<f64>) -> f64 {
    line.lines().map(|l| l.dx().hypot(l.dy())).sum()
}

/// Squared Euclidean distance from `p` to the segment `a`–`b`.
pub fn segment_distance_2(p: Coord, a: Coord, b: Coord) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_2 = dx * dx + dy * dy;
    let t = if len_2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + t * dx - p.x, a.y + t * dy - p.y);
    cx * cx + cy * cy
}

/// Squared Euclidean distance from `p` to the nearest segment of `line`.
pub(crate) fn polyline_distance_2(p: Coord, line: &LineString<f64>) -> f64 {
    match line.0.as_slice() {
        [] => f64::INFINITY,
        [only] => segment_distance_2(p, *only, *only),
        coords => coords
            .windows(2)
            .map(|w| segment_distance_2(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}
