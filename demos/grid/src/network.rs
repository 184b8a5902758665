//! Synthetic street and neighborhood layers.
//!
//! A 3 × 3 block grid (four streets each way, ~110 m blocks) split between
//! two neighborhoods along x = 0.0015.  The north-south avenue at x = 0.0
//! is one-way northbound; one east-west street bends through a mid-block
//! vertex so the visual and logical tables differ.

use geo::{coord, Geometry, LineString, Rect};

use mcgrp_core::{NeighborhoodId, StreetTags};
use mcgrp_pipeline::{RawLayers, RawNeighborhood, RawStreet};

/// Grid spacing in degrees.
pub const STEP: f64 = 0.001;

fn street(name: &str, maxspeed: &str, coords: Vec<(f64, f64)>) -> RawStreet {
    RawStreet {
        geometry:     Geometry::LineString(LineString::from(coords)),
        tags:         StreetTags {
            name: Some(name.to_owned()),
            maxspeed: Some(maxspeed.to_owned()),
            highway: Some("residential".to_owned()),
            ..StreetTags::default()
        },
        neighborhood: None,
    }
}

fn block(id: i64, name: &str, x0: f64, x1: f64) -> RawNeighborhood {
    let rect = Rect::new(coord! { x: x0, y: -STEP }, coord! { x: x1, y: 4.0 * STEP });
    RawNeighborhood { id: NeighborhoodId(id), name: name.to_owned(), geometry: Geometry::Polygon(rect.to_polygon()) }
}

pub fn build_layers() -> RawLayers {
    let mut streets = Vec::new();

    for row in 0..4 {
        let y = row as f64 * STEP;
        let mut coords: Vec<(f64, f64)> = (0..4).map(|col| (col as f64 * STEP, y)).collect();
        if row == 1 {
            // a kink between the first two crossings
            coords.insert(1, (0.5 * STEP, y + 0.2 * STEP));
        }
        streets.push(street(&format!("Rua {}", row + 1), "30", coords));
    }

    for col in 0..4 {
        let x = col as f64 * STEP;
        let coords: Vec<(f64, f64)> = (0..4).map(|row| (x, row as f64 * STEP)).collect();
        let mut avenue = street(&format!("Avenida {}", col + 1), "50", coords);
        if col == 0 {
            avenue.tags.oneway = Some("yes".to_owned());
        }
        streets.push(avenue);
    }

    RawLayers {
        crs:           Some("EPSG:4326".to_owned()),
        streets,
        neighborhoods: vec![
            block(1, "Centro", -STEP, 1.5 * STEP),
            block(2, "Porto", 1.5 * STEP, 4.0 * STEP),
        ],
    }
}
