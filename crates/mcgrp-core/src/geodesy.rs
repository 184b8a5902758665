//! Great-circle geometry and cost formulas.
//!
//! Coordinates are `geo::Coord<f64>` with `x` = longitude and `y` = latitude
//! (EPSG:4326).  Distances and angles are rounded to [`PRECISION_DIGITS`]
//! decimal digits wherever they end up in a record, so two runs over the
//! same input produce identical tables.

use geo::Coord;

/// Mean Earth radius used by every distance in the pipeline, metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Decimal digits kept on stored distances, angles and coordinate keys.
pub const PRECISION_DIGITS: i32 = 6;

/// Two coordinates closer than this are the same place, metres.
pub const PROXIMITY_THRESHOLD_M: f64 = 1.0;

/// Default and maximum credited speed, km/h.
pub const DEFAULT_MAX_SPEED_KMH: u32 = 20;

const SERVICE_COST_FACTOR: f64 = 1.5;

// ── Rounding ─────────────────────────────────────────────────────────────────

/// Round `value` to `digits` decimal digits.
#[inline]
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Round to [`PRECISION_DIGITS`].
#[inline]
pub fn round6(value: f64) -> f64 {
    round_to(value, PRECISION_DIGITS)
}

/// Fold any angle in degrees into `[0, 360)`.
#[inline]
fn normalize_deg(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    if d >= 360.0 { 0.0 } else { d }
}

// ── Coordinate key ───────────────────────────────────────────────────────────

/// A coordinate rounded to [`PRECISION_DIGITS`], usable as a hash key.
///
/// Every "same place" grouping in the pipeline (shared vertices, node
/// indices, visual points) goes through this type.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct CoordKey(i64, i64);

impl CoordKey {
    pub fn of(c: Coord) -> Self {
        let factor = 10f64.powi(PRECISION_DIGITS);
        CoordKey((c.x * factor).round() as i64, (c.y * factor).round() as i64)
    }
}

impl From<Coord> for CoordKey {
    fn from(c: Coord) -> Self {
        CoordKey::of(c)
    }
}

// ── Distances and bearings ───────────────────────────────────────────────────

/// Haversine great-circle distance in metres, rounded to 6 digits.
pub fn haversine_distance(a: Coord, b: Coord) -> f64 {
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();

    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();

    let h = (d_lat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    round6(EARTH_RADIUS_M * c)
}

/// Initial bearing from `a` to `b` in degrees, `[0, 360)`.
pub fn azimuth(a: Coord, b: Coord) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let d_lon = (b.x - a.x).to_radians();

    let x = d_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    normalize_deg(x.atan2(y).to_degrees())
}

/// The reciprocal bearing, `(angle + 180) mod 360`.
#[inline]
pub fn azimuth_inverse(angle: f64) -> f64 {
    normalize_deg(angle + 180.0)
}

/// Circular mean of `angles` (degrees), or `None` when there are none.
pub fn mean_angle_deg<I>(angles: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sin_sum = 0.0;
    let mut cos_sum = 0.0;
    let mut count = 0usize;
    for angle in angles {
        let rad = angle.to_radians();
        sin_sum += rad.sin();
        cos_sum += rad.cos();
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(normalize_deg(sin_sum.atan2(cos_sum).to_degrees()))
}

/// `true` when `a` and `b` are less than [`PROXIMITY_THRESHOLD_M`] apart.
#[inline]
pub fn are_coords_close(a: Coord, b: Coord) -> bool {
    haversine_distance(a, b) < PROXIMITY_THRESHOLD_M
}

/// Sum of the haversine lengths of consecutive coordinates, metres.
pub fn polyline_length_m(coords: &[Coord]) -> f64 {
    coords.windows(2).map(|w| haversine_distance(w[0], w[1])).sum()
}

/// Rounded bearing of the leg `a → b` and its reciprocal.
pub fn leg_angles(a: Coord, b: Coord) -> (f64, f64) {
    let angle = azimuth(a, b);
    (round6(angle), round6(azimuth_inverse(angle)))
}

/// Bearing of every leg of `coords`, unrounded.
pub fn segment_azimuths(coords: &[Coord]) -> Vec<f64> {
    coords.windows(2).map(|w| azimuth(w[0], w[1])).collect()
}

// ── Costs ────────────────────────────────────────────────────────────────────

/// First run of ASCII digits in a `maxspeed` tag, e.g. `"50 mph"` → 50.
pub fn parse_speed_kmh(maxspeed: &str) -> Option<u32> {
    let digits: String = maxspeed
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Seconds needed to traverse `dist_km` at the street's speed limit.
///
/// The effective speed is the tagged limit clamped to
/// [`DEFAULT_MAX_SPEED_KMH`]; a missing, zero or unparsable tag uses the
/// default.  A missing or non-positive distance costs nothing.
pub fn calculate_traversal_cost(dist_km: Option<f64>, maxspeed: Option<&str>) -> u32 {
    let dist_km = match dist_km {
        Some(d) if d.is_finite() && d > 0.0 => d,
        _ => return 0,
    };
    let speed = maxspeed
        .and_then(parse_speed_kmh)
        .filter(|&s| s > 0)
        .unwrap_or(DEFAULT_MAX_SPEED_KMH)
        .min(DEFAULT_MAX_SPEED_KMH);
    (dist_km / speed as f64 * 3600.0).ceil() as u32
}

/// Service cost of a street, `ceil(1.5 × traversal)`.
#[inline]
pub fn service_cost(traversal: u32) -> u32 {
    (traversal as f64 * SERVICE_COST_FACTOR).ceil() as u32
}
