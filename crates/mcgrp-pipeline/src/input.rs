//! Raw input layers and their validation.
//!
//! File-format adapters (GeoPackage, shapefile, …) live outside this
//! workspace; they hand over already-decoded geometry through
//! [`RawLayers`].

use geo::{Geometry, MultiPolygon};
use log::info;

use mcgrp_core::{Crs, DenseId, GraphState, Neighborhood, NeighborhoodId, NeighborhoodRef, StreetId, StreetRecord, StreetTags};

use crate::error::{PipelineError, PipelineResult};

#[derive(Clone, Debug)]
pub struct RawStreet {
    pub geometry:     Geometry<f64>,
    pub tags:         StreetTags,
    pub neighborhood: Option<NeighborhoodRef>,
}

#[derive(Clone, Debug)]
pub struct RawNeighborhood {
    pub id:       NeighborhoodId,
    pub name:     String,
    pub geometry: Geometry<f64>,
}

/// The two input layers plus their CRS code.
#[derive(Clone, Debug, Default)]
pub struct RawLayers {
    pub crs:           Option<String>,
    pub streets:       Vec<RawStreet>,
    pub neighborhoods: Vec<RawNeighborhood>,
}

impl RawLayers {
    /// Validate the layers and build the initial state.
    ///
    /// Street ids are assigned `1..=N` in input order; the visual table
    /// starts as a copy of the logical one.
    pub fn into_state(self) -> PipelineResult<GraphState> {
        if self.streets.is_empty() {
            return Err(PipelineError::InvalidInput("the streets layer is empty".into()));
        }
        if self.neighborhoods.is_empty() {
            return Err(PipelineError::InvalidInput("the neighborhoods layer is empty".into()));
        }
        let code = self.crs.ok_or(PipelineError::MissingCrs)?;
        let crs = Crs::parse(&code).map_err(|_| PipelineError::UnsupportedCrs(code.clone()))?;

        let neighborhoods = self
            .neighborhoods
            .into_iter()
            .map(|n| {
                let polygon = match n.geometry {
                    Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    Geometry::MultiPolygon(mp) => mp,
                    other => {
                        return Err(PipelineError::InvalidInput(format!(
                            "neighborhood {} is a {}, expected a Polygon or MultiPolygon",
                            n.id,
                            geometry_kind(&other)
                        )));
                    }
                };
                Ok(Neighborhood { id: n.id, name: n.name, polygon })
            })
            .collect::<PipelineResult<Vec<_>>>()?;

        let mut state = GraphState::new(crs, neighborhoods);
        for (row, raw) in self.streets.into_iter().enumerate() {
            let line = match raw.geometry {
                Geometry::LineString(line) if line.0.len() >= 2 => line,
                Geometry::LineString(_) => {
                    return Err(PipelineError::InvalidInput(format!(
                        "street at row {row} has fewer than two coordinates"
                    )));
                }
                other => {
                    return Err(PipelineError::InvalidInput(format!(
                        "street at row {row} is a {}, expected a LineString",
                        geometry_kind(&other)
                    )));
                }
            };
            let mut street = StreetRecord::new(StreetId::from_ordinal(row + 1), line, raw.tags);
            street.neighborhood = raw.neighborhood;
            state.streets.push(street);
        }
        state.mirror_visual_streets();

        info!(
            "loaded {} streets and {} neighborhoods ({})",
            state.streets.len(),
            state.neighborhoods.len(),
            state.crs
        );
        Ok(state)
    }
}

fn geometry_kind(g: &Geometry<f64>) -> &'static str {
    match g {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
