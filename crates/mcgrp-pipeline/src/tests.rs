//! Unit and end-to-end tests for mcgrp-pipeline.

#[cfg(test)]
pub(crate) mod helpers {
    use geo::{coord, Geometry, LineString, Rect};

    use mcgrp_core::{NeighborhoodId, NeighborhoodRef, StreetTags};

    use crate::input::{RawLayers, RawNeighborhood, RawStreet};

    pub fn square(id: i64, x0: f64, y0: f64, x1: f64, y1: f64) -> RawNeighborhood {
        let poly = Rect::new(coord! { x: x0, y: y0 }, coord! { x: x1, y: y1 }).to_polygon();
        RawNeighborhood { id: NeighborhoodId(id), name: format!("Hood {id}"), geometry: Geometry::Polygon(poly) }
    }

    /// Two neighborhoods side by side: 1 = x∈[0, .01], 2 = x∈[.01, .02],
    /// both y∈[0, .01].
    pub fn two_hoods() -> Vec<RawNeighborhood> {
        vec![square(1, 0.0, 0.0, 0.01, 0.01), square(2, 0.01, 0.0, 0.02, 0.01)]
    }

    pub fn street(coords: &[(f64, f64)]) -> RawStreet {
        RawStreet {
            geometry:     Geometry::LineString(LineString::from(coords.to_vec())),
            tags:         StreetTags { name: Some("Rua".into()), ..StreetTags::default() },
            neighborhood: None,
        }
    }

    pub fn in_hood(mut s: RawStreet, id: i64) -> RawStreet {
        s.neighborhood = Some(NeighborhoodRef::new(NeighborhoodId(id), format!("Hood {id}")));
        s
    }

    pub fn layers(streets: Vec<RawStreet>) -> RawLayers {
        RawLayers { crs: Some("EPSG:4326".into()), streets, neighborhoods: two_hoods() }
    }

    /// A small road network across both neighborhoods.
    ///
    /// ```text
    ///                 (.005,.008)
    ///                     |  C
    ///  (.002,.005) ~R~ (.005,.005) ─R─ (.008,.005) ─L─ (.0115,.005) ─H→ (.018,.005)
    ///                     |                        hood 1 | hood 2
    ///                 (.005,.002)
    /// ```
    ///
    /// R bends through (.0035, .0052).  H is one-way.  No street carries a
    /// neighborhood; the normaliser assigns them.
    pub fn grid() -> RawLayers {
        let r = street(&[(0.002, 0.005), (0.0035, 0.0052), (0.005, 0.005), (0.008, 0.005)]);
        let mut c = street(&[(0.005, 0.002), (0.005, 0.005), (0.005, 0.008)]);
        c.tags.name = None;
        c.tags.alt_name = Some("Travessa".into());
        let mut l = street(&[(0.008, 0.005), (0.0115, 0.005)]);
        l.tags.name = None;
        let mut h = street(&[(0.0115, 0.005), (0.018, 0.005)]);
        h.tags.oneway = Some("yes".into());
        h.tags.maxspeed = Some("50".into());
        layers(vec![r, c, l, h])
    }
}

// ── Input validation ─────────────────────────────────────────────────────────

#[cfg(test)]
mod input {
    use geo::{point, Geometry, LineString};

    use crate::error::PipelineError;
    use crate::input::RawLayers;

    use super::helpers::{grid, layers, street, two_hoods};

    #[test]
    fn grid_loads_with_dense_ids_and_mirrored_visuals() {
        let state = grid().into_state().unwrap();
        assert_eq!(state.streets.len(), 4);
        assert_eq!(state.visual_streets, state.streets);
        for (i, s) in state.streets.iter().enumerate() {
            assert_eq!(s.id.0 as usize, i + 1);
        }
    }

    #[test]
    fn empty_layers_are_rejected() {
        let no_streets = RawLayers { crs: Some("EPSG:4326".into()), streets: vec![], neighborhoods: two_hoods() };
        assert!(matches!(no_streets.into_state(), Err(PipelineError::InvalidInput(_))));

        let mut no_hoods = layers(vec![street(&[(0.0, 0.0), (0.001, 0.0)])]);
        no_hoods.neighborhoods.clear();
        assert!(matches!(no_hoods.into_state(), Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn crs_must_be_present_and_geographic() {
        let mut missing = grid();
        missing.crs = None;
        assert!(matches!(missing.into_state(), Err(PipelineError::MissingCrs)));

        let mut utm = grid();
        utm.crs = Some("EPSG:31983".into());
        let err = utm.into_state().unwrap_err();
        assert!(matches!(&err, PipelineError::UnsupportedCrs(code) if code == "EPSG:31983"));
        assert!(err.to_string().contains("reproject"), "{err}");

        let mut alias = grid();
        alias.crs = Some("OGC:CRS84".into());
        assert!(alias.into_state().is_ok());
    }

    #[test]
    fn wrong_geometry_kinds_are_rejected() {
        let mut point_street = grid();
        point_street.streets[1].geometry = Geometry::Point(point! { x: 0.0, y: 0.0 });
        let err = point_street.into_state().unwrap_err();
        assert!(err.to_string().contains("row 1"), "{err}");

        let mut short = grid();
        short.streets[0].geometry = Geometry::LineString(LineString::from(vec![(0.0, 0.0)]));
        assert!(matches!(short.into_state(), Err(PipelineError::InvalidInput(_))));

        let mut line_hood = grid();
        line_hood.neighborhoods[0].geometry = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)]));
        assert!(matches!(line_hood.into_state(), Err(PipelineError::InvalidInput(_))));
    }
}

// ── Normalisation ────────────────────────────────────────────────────────────

#[cfg(test)]
mod normalize {
    use geo::coord;

    use mcgrp_core::{NeighborhoodId, PipelineConfig};
    use mcgrp_spatial::NeighborhoodIndex;

    use crate::normalize::{filter_and_normalize, process_neighborhood_boundaries};

    use super::helpers::{grid, in_hood, layers, street};

    #[test]
    fn names_fall_back_to_alt_name_then_placeholder() {
        let state = grid().into_state().unwrap();
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        let state = filter_and_normalize(state, &PipelineConfig::default(), &hoods);

        let names: Vec<_> = state.streets.iter().map(|s| s.tags.name.as_deref()).collect();
        assert_eq!(names, [Some("Rua"), Some("Travessa"), Some("unknown"), Some("Rua")]);
        assert_eq!(state.visual_streets, state.streets);
    }

    #[test]
    fn unassigned_streets_get_the_dominant_neighborhood() {
        let state = grid().into_state().unwrap();
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        let state = filter_and_normalize(state, &PipelineConfig::default(), &hoods);

        let ids: Vec<_> = state.streets.iter().map(|s| s.neighborhood_id()).collect();
        let (h1, h2) = (Some(NeighborhoodId(1)), Some(NeighborhoodId(2)));
        // L runs 2/3.5 of its length in hood 1.
        assert_eq!(ids, [h1, h1, h1, h2]);
    }

    #[test]
    fn split_source_segments_are_snapped_together() {
        let mut west = in_hood(street(&[(0.005, 0.005), (0.01, 0.005)]), 1);
        west.tags.osm_id = Some("way/7".into());
        let mut east = in_hood(street(&[(0.0100001, 0.005), (0.012, 0.005), (0.015, 0.005)]), 2);
        east.tags.osm_id = Some("way/7".into());

        let state = layers(vec![west, east]).into_state().unwrap();
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        let state = process_neighborhood_boundaries(state, &PipelineConfig::default(), &hoods);

        assert_eq!(state.streets.len(), 2);
        let (w, e) = (&state.streets[0], &state.streets[1]);
        assert_eq!(w.end(), e.start());
        assert_eq!(e.start(), Some(coord! { x: 0.012, y: 0.005 }));
        assert_eq!(e.coords().len(), 2);
        // 5/7 of the stretched west segment is still in hood 1.
        assert_eq!(w.neighborhood_id(), Some(NeighborhoodId(1)));
        assert_eq!(e.neighborhood_id(), Some(NeighborhoodId(2)));
        assert_eq!(state.visual_streets, state.streets);
    }

    #[test]
    fn collapsed_segments_are_dropped_and_ids_resequenced() {
        let mut west = in_hood(street(&[(0.005, 0.005), (0.01, 0.005)]), 1);
        west.tags.osm_id = Some("way/7".into());
        let mut east = in_hood(street(&[(0.0100001, 0.005), (0.015, 0.005)]), 2);
        east.tags.osm_id = Some("way/7".into());
        let other = street(&[(0.001, 0.001), (0.002, 0.001)]);

        let state = layers(vec![west, east, other]).into_state().unwrap();
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        let state = process_neighborhood_boundaries(state, &PipelineConfig::default(), &hoods);

        assert_eq!(state.streets.len(), 2);
        assert_eq!(state.streets[0].end(), Some(coord! { x: 0.015, y: 0.005 }));
        assert_eq!(state.streets[1].id.0, 2);
        assert!(state.check_integrity().is_err(), "not indexed yet");
    }

    #[test]
    fn same_neighborhood_pairs_are_left_alone() {
        let mut a = in_hood(street(&[(0.002, 0.005), (0.004, 0.005)]), 1);
        a.tags.osm_id = Some("way/1".into());
        let mut b = in_hood(street(&[(0.0040001, 0.005), (0.006, 0.005)]), 1);
        b.tags.osm_id = Some("way/1".into());

        let state = layers(vec![a, b]).into_state().unwrap();
        let before = state.streets.clone();
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        let state = process_neighborhood_boundaries(state, &PipelineConfig::default(), &hoods);
        assert_eq!(state.streets, before);
    }
}

// ── Explosion ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod explode {
    use mcgrp_core::geodesy::{haversine_distance, round6};
    use mcgrp_core::StreetId;

    use crate::explode::explode_and_label;

    use super::helpers::{grid, layers, street};

    #[test]
    fn vertices_get_distances_bearings_and_endpoint_flags() {
        let state = layers(vec![street(&[(0.0, 0.0), (0.001, 0.0), (0.001, 0.001)])]).into_state().unwrap();
        let state = explode_and_label(state);

        let pts = state.street_points(StreetId(1));
        assert_eq!(pts.len(), 3);
        assert_eq!(pts.iter().map(|p| p.vertex_index).collect::<Vec<_>>(), [0, 1, 2]);
        assert_eq!(pts.iter().map(|p| p.vertex_to).collect::<Vec<_>>(), [0, 0, 1]);
        assert_eq!(pts.iter().map(|p| p.endpoint).collect::<Vec<_>>(), [true, false, true]);
        assert_eq!(pts[0].distance_km, 0.0);
        assert_eq!(pts[1].distance_km, round6(haversine_distance(pts[0].coord, pts[1].coord) / 1000.0));

        assert!((pts[0].angle.unwrap() - 90.0).abs() < 1e-6);
        assert!((pts[0].angle_inv.unwrap() - 270.0).abs() < 1e-6);
        assert!(pts[1].angle.unwrap().abs() < 1e-6);
        assert_eq!(pts[2].angle, None);
        assert_eq!(pts[2].angle_inv, None);

        let total = state.streets[0].total_dist_km;
        assert!((total - (pts[1].distance_km + pts[2].distance_km)).abs() < 2e-6);
        assert_eq!(state.visual_streets[0].total_dist_km, total);
    }

    #[test]
    fn coincident_vertices_are_shared() {
        let state = explode_and_label(grid().into_state().unwrap());
        let shared: Vec<(u32, u32)> = state
            .points
            .iter()
            .filter(|p| p.shared)
            .map(|p| (p.street_id.0, p.vertex_index))
            .collect();
        // (.005,.005) on R and C, (.008,.005) on R and L, (.0115,.005) on L and H.
        assert_eq!(shared, [(1, 2), (1, 3), (2, 1), (3, 0), (3, 1), (4, 0)]);
        assert!(state.points.iter().all(|p| p.name.is_some() || p.alt_name.is_some() || p.street_id.0 == 3));
    }
}

// ── Endpoint pruning ─────────────────────────────────────────────────────────

#[cfg(test)]
mod prune {
    use geo::coord;

    use mcgrp_core::{GraphState, PipelineConfig, StreetId};
    use mcgrp_spatial::NeighborhoodIndex;

    use crate::explode::explode_and_label;
    use crate::prune::remove_invalid_endpoints;

    use super::helpers::{in_hood, layers, street};

    fn run(streets: Vec<crate::input::RawStreet>) -> GraphState {
        let state = explode_and_label(layers(streets).into_state().unwrap());
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        remove_invalid_endpoints(state, &PipelineConfig::default(), &hoods)
    }

    #[test]
    fn start_on_the_boundary_is_trimmed() {
        // Starts ~0.45 m from the x = .01 boundary; first leg ~22 m.
        let state = run(vec![in_hood(street(&[(0.009996, 0.005), (0.0098, 0.005), (0.005, 0.005)]), 1)]);

        assert_eq!(state.streets.len(), 1);
        assert_eq!(state.streets[0].start(), Some(coord! { x: 0.0098, y: 0.005 }));
        assert_eq!(state.visual_streets[0].coords().len(), 2);

        let pts = state.street_points(StreetId(1));
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].vertex_index, 0);
        assert_eq!(pts[0].distance_km, 0.0);
        assert!(pts[0].endpoint);
        assert_eq!(pts[1].vertex_index, 1);
        assert_eq!(pts[1].vertex_to, 0);
    }

    #[test]
    fn end_on_the_boundary_is_trimmed_and_loses_its_bearing() {
        let state = run(vec![in_hood(street(&[(0.005, 0.005), (0.0098, 0.005), (0.009996, 0.005)]), 1)]);

        let pts = state.street_points(StreetId(1));
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].coord, coord! { x: 0.0098, y: 0.005 });
        assert!(pts[1].endpoint);
        assert_eq!(pts[1].angle, None);
        assert_eq!(state.streets[0].end(), Some(coord! { x: 0.0098, y: 0.005 }));
    }

    #[test]
    fn two_point_stubs_are_deleted_and_ids_resequenced() {
        let stub = in_hood(street(&[(0.009996, 0.005), (0.0098, 0.005)]), 1);
        let keep = in_hood(street(&[(0.002, 0.002), (0.004, 0.002)]), 1);
        let state = run(vec![stub, keep]);

        assert_eq!(state.streets.len(), 1);
        assert_eq!(state.streets[0].id, StreetId(1));
        assert_eq!(state.streets[0].start(), Some(coord! { x: 0.002, y: 0.002 }));
        assert!(state.points.iter().all(|p| p.street_id == StreetId(1)));
        assert_eq!(state.visual_streets.len(), 1);
    }

    #[test]
    fn long_legs_and_shared_or_unassigned_endpoints_are_protected() {
        // ~111 m first leg.
        let long = in_hood(street(&[(0.009996, 0.003), (0.008996, 0.003)]), 1);
        // Shared with the next street.
        let shared_a = in_hood(street(&[(0.009996, 0.006), (0.0098, 0.006)]), 1);
        let shared_b = in_hood(street(&[(0.009996, 0.006), (0.009996, 0.008)]), 1);
        // No neighborhood.
        let loose = street(&[(0.009996, 0.001), (0.0098, 0.001)]);

        let state = run(vec![long, shared_a, shared_b, loose]);
        assert_eq!(state.streets.len(), 4);
        assert_eq!(state.points.len(), 8);
    }
}

// ── Splitting ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod split {
    use geo::coord;

    use mcgrp_core::{SplitCriteria, StreetId};

    use crate::explode::explode_and_label;
    use crate::split::{split_by_special_vertices, split_into_two_point_segments};

    use super::helpers::{grid, layers, street};

    #[test]
    fn shared_interior_vertices_cut_streets() {
        let state = explode_and_label(grid().into_state().unwrap());
        let state = split_by_special_vertices(state, SplitCriteria::default());

        // R and C are cut at (.005, .005); L and H are untouched.
        assert_eq!(state.streets.len(), 6);
        let ids: Vec<u32> = state.streets.iter().map(|s| s.id.0).collect();
        assert_eq!(ids, [1, 2, 3, 4, 5, 6]);

        let r1 = state.street_points(StreetId(1));
        assert_eq!(r1.len(), 3);
        assert_eq!(r1[2].coord, coord! { x: 0.005, y: 0.005 });
        assert!(r1[2].endpoint);
        assert_eq!(r1[2].angle, None);
        assert!(!r1[1].endpoint);

        let r2 = state.street_points(StreetId(2));
        assert_eq!(r2.len(), 2);
        assert_eq!(r2[0].distance_km, 0.0);
        assert!(r2[0].angle.is_some());

        let total: f64 = r1.iter().map(|p| p.distance_km).sum();
        assert!((state.streets[0].total_dist_km - total).abs() < 2e-6);
        assert_eq!(state.visual_streets, state.streets);
    }

    #[test]
    fn no_criteria_is_a_no_op() {
        let state = explode_and_label(grid().into_state().unwrap());
        let before = state.streets.clone();
        let state = split_by_special_vertices(state, SplitCriteria::NONE);
        assert_eq!(state.streets, before);
    }

    #[test]
    fn required_vertices_cut_when_asked() {
        let mut state =
            explode_and_label(layers(vec![street(&[(0.0, 0.0), (0.001, 0.0), (0.002, 0.0)])]).into_state().unwrap());
        state.points[1].service.required = true;

        let shared_only = split_by_special_vertices(state.clone(), SplitCriteria::default());
        assert_eq!(shared_only.streets.len(), 1);

        let criteria = SplitCriteria { shared: false, depot: false, required: true };
        let split = split_by_special_vertices(state, criteria);
        assert_eq!(split.streets.len(), 2);
        assert_eq!(split.streets[1].start(), Some(coord! { x: 0.001, y: 0.0 }));
    }

    #[test]
    fn two_point_pieces_keep_their_stretch_of_the_visual_line() {
        let state =
            explode_and_label(layers(vec![street(&[(0.0, 0.0), (0.001, 0.0005), (0.002, 0.0)])]).into_state().unwrap());
        let state = split_into_two_point_segments(state);

        assert_eq!(state.streets.len(), 2);
        assert_eq!(state.points.len(), 4);
        for (s, v) in state.streets.iter().zip(&state.visual_streets) {
            assert_eq!(s.id, v.id);
            assert_eq!(s.coords().len(), 2);
            assert_eq!(v.coords(), s.coords());
        }

        let second = state.street_points(StreetId(2));
        assert_eq!(second[0].vertex_index, 0);
        assert_eq!(second[0].distance_km, 0.0);
        assert_eq!(second[1].vertex_to, 0);
        assert_eq!(state.streets[1].total_dist_km, second[1].distance_km);
    }

    #[test]
    fn visual_curvature_survives_the_two_point_split() {
        let mut state = explode_and_label(
            layers(vec![street(&[(0.0, 0.0), (0.001, 0.0), (0.002, 0.0)])]).into_state().unwrap(),
        );
        state.visual_streets[0].geometry =
            geo::LineString::from(vec![(0.0, 0.0), (0.0005, 0.0002), (0.001, 0.0), (0.0015, -0.0002), (0.002, 0.0)]);

        let state = split_into_two_point_segments(state);
        assert_eq!(state.visual_streets[0].coords().len(), 3);
        assert_eq!(state.visual_streets[1].coords().len(), 3);
        assert_eq!(state.visual_streets[1].start(), Some(coord! { x: 0.001, y: 0.0 }));
    }
}

// ── Reduction ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod reduce {
    use geo::coord;

    use mcgrp_core::geodesy::round6;
    use mcgrp_core::{NeighborhoodId, PipelineConfig, StreetId};
    use mcgrp_spatial::NeighborhoodIndex;

    use crate::explode::explode_and_label;
    use crate::reduce::{create_reduced_graph, remove_boundary_vertices};

    use super::helpers::{in_hood, layers, street};

    #[test]
    fn interior_vertices_collapse_into_one_leg() {
        let state = explode_and_label(
            layers(vec![street(&[(0.0, 0.0), (0.001, 0.0), (0.002, 0.0), (0.003, 0.0)])]).into_state().unwrap(),
        );
        let legs: f64 = state.points.iter().map(|p| p.distance_km).sum();
        let state = create_reduced_graph(state);

        let pts = state.street_points(StreetId(1));
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].vertex_index, 1);
        assert_eq!(pts[1].vertex_to, 0);
        assert_eq!(pts[1].distance_km, round6(legs));
        assert!((pts[0].angle.unwrap() - 90.0).abs() < 1e-6);
        assert_eq!(state.streets[0].coords().len(), 2);
        assert_eq!(state.visual_streets[0].coords().len(), 4, "visual geometry keeps every vertex");
    }

    #[test]
    fn shared_vertices_survive_the_collapse() {
        let through = street(&[(0.0, 0.0), (0.001, 0.0), (0.002, 0.0), (0.003, 0.0)]);
        let cross = street(&[(0.002, -0.001), (0.002, 0.0)]);
        let state = create_reduced_graph(explode_and_label(layers(vec![through, cross]).into_state().unwrap()));

        let pts = state.street_points(StreetId(1));
        let xs: Vec<f64> = pts.iter().map(|p| p.coord.x).collect();
        assert_eq!(xs, [0.0, 0.002, 0.003]);
        assert_eq!(pts.iter().map(|p| p.vertex_to).collect::<Vec<_>>(), [0, 0, 1]);
    }

    fn merge(streets: Vec<crate::input::RawStreet>) -> mcgrp_core::GraphState {
        let state = explode_and_label(layers(streets).into_state().unwrap());
        let hoods = NeighborhoodIndex::new(&state.neighborhoods);
        remove_boundary_vertices(state, &PipelineConfig::default(), &hoods)
    }

    #[test]
    fn boundary_pair_merges_into_one_street() {
        let a_c = in_hood(street(&[(0.007, 0.005), (0.01, 0.005)]), 1);
        let c_b = in_hood(street(&[(0.01, 0.005), (0.014, 0.005)]), 2);
        let parts = explode_and_label(layers(vec![a_c.clone(), c_b.clone()]).into_state().unwrap());
        let summed = round6(parts.streets[0].total_dist_km + parts.streets[1].total_dist_km);

        let state = merge(vec![a_c, c_b]);
        assert_eq!(state.streets.len(), 1);
        let s = &state.streets[0];
        assert_eq!(s.id, StreetId(1));
        assert_eq!(s.coords(), [coord! { x: 0.007, y: 0.005 }, coord! { x: 0.014, y: 0.005 }]);
        assert_eq!(s.total_dist_km, summed);
        // 4/7 of the merged line lies in hood 2.
        assert_eq!(s.neighborhood_id(), Some(NeighborhoodId(2)));

        assert_eq!(state.points.len(), 2);
        assert!(state.points.iter().all(|p| p.coord.x != 0.01), "junction is gone");
        let end = &state.street_points(StreetId(1))[1];
        assert_eq!(end.distance_km, summed);
        assert_eq!(state.visual_streets[0].coords().len(), 3);
    }

    #[test]
    fn merge_orients_from_a_street_start() {
        // Both streets start at the junction, so the merged street starts at
        // the far end of the second one.
        let c_a = in_hood(street(&[(0.01, 0.005), (0.006, 0.005)]), 1);
        let c_b = in_hood(street(&[(0.01, 0.005), (0.014, 0.005)]), 2);
        let state = merge(vec![c_a, c_b]);

        assert_eq!(state.streets.len(), 1);
        assert_eq!(
            state.visual_streets[0].coords(),
            [coord! { x: 0.014, y: 0.005 }, coord! { x: 0.01, y: 0.005 }, coord! { x: 0.006, y: 0.005 }]
        );
        assert_eq!(state.streets[0].start(), Some(coord! { x: 0.014, y: 0.005 }));
    }

    #[test]
    fn same_neighborhood_junctions_are_kept() {
        let a = in_hood(street(&[(0.002, 0.005), (0.004, 0.005)]), 1);
        let b = in_hood(street(&[(0.004, 0.005), (0.006, 0.005)]), 1);
        let state = merge(vec![a, b]);
        assert_eq!(state.streets.len(), 2);
        assert_eq!(state.points.len(), 4);
    }
}

// ── Indexing ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod index {
    use mcgrp_core::{ArcIndex, EdgeIndex, LinkIndex, NeighborhoodId, NodeIndex, PipelineConfig};

    use crate::explode::explode_and_label;
    use crate::index::assign_indices;

    use super::helpers::{in_hood, layers, street};

    fn indexed(streets: Vec<crate::input::RawStreet>, config: &PipelineConfig) -> mcgrp_core::GraphState {
        assign_indices(explode_and_label(layers(streets).into_state().unwrap()), config).unwrap()
    }

    #[test]
    fn edges_and_arcs_are_numbered_separately() {
        let mut one_way = street(&[(0.001, 0.001), (0.002, 0.001)]);
        one_way.tags.oneway = Some("True".into());
        let two_way = street(&[(0.002, 0.001), (0.003, 0.001)]);
        let mut tagged_no = street(&[(0.003, 0.001), (0.004, 0.001)]);
        tagged_no.tags.oneway = Some("no".into());

        let state = indexed(vec![one_way, two_way, tagged_no], &PipelineConfig::default());
        let links: Vec<_> = state.streets.iter().map(|s| s.link).collect();
        assert_eq!(
            links,
            [Some(LinkIndex::Arc(ArcIndex(1))), Some(LinkIndex::Edge(EdgeIndex(1))), Some(LinkIndex::Edge(EdgeIndex(2)))]
        );
        assert_eq!(state.streets[1].from_node, Some(NodeIndex(2)));
        assert_eq!(state.streets[1].to_node, Some(NodeIndex(3)));
        assert_eq!(state.nodes.len(), 4);
        assert_eq!(state.visual_streets[0].link, state.streets[0].link);
        state.check_integrity().unwrap();
    }

    #[test]
    fn costs_follow_distance_and_speed() {
        let mut fast = street(&[(0.0, 0.0), (0.01, 0.0)]);
        fast.tags.maxspeed = Some("80".into());
        let state = indexed(vec![fast], &PipelineConfig::default());

        let s = &state.streets[0];
        // ~1.112 km at the 20 km/h cap.
        assert_eq!(s.traversal_cost, (s.total_dist_km / 20.0 * 3600.0).ceil() as u32);
        assert_eq!(s.service_cost, (s.traversal_cost as f64 * 1.5).ceil() as u32);
        assert_eq!(state.visual_streets[0].traversal_cost, s.traversal_cost);
    }

    #[test]
    fn self_loops_are_removed() {
        let loop_ = street(&[(0.001, 0.001), (0.0010000001, 0.001)]);
        let good = street(&[(0.002, 0.001), (0.003, 0.001)]);
        let state = indexed(vec![loop_, good], &PipelineConfig::default());

        assert_eq!(state.streets.len(), 1);
        assert_eq!(state.streets[0].id.0, 1);
        assert_eq!(state.streets[0].from_node, Some(NodeIndex(1)));
        state.check_integrity().unwrap();
    }

    #[test]
    fn allowlist_keeps_only_listed_neighborhoods() {
        let west = in_hood(street(&[(0.002, 0.005), (0.004, 0.005)]), 1);
        let east = in_hood(street(&[(0.012, 0.005), (0.014, 0.005)]), 2);
        let config = PipelineConfig { valid_neighborhoods: Some(vec![NeighborhoodId(2)]), ..PipelineConfig::default() };
        let state = indexed(vec![west, east], &config);

        assert_eq!(state.streets.len(), 1);
        assert_eq!(state.streets[0].neighborhood_id(), Some(NeighborhoodId(2)));
        assert_eq!(state.points.len(), 2);
        state.check_integrity().unwrap();
    }

    #[test]
    fn indexing_is_idempotent() {
        let a = street(&[(0.001, 0.001), (0.002, 0.001)]);
        let mut b = street(&[(0.002, 0.001), (0.002, 0.002)]);
        b.tags.oneway = Some("yes".into());
        let config = PipelineConfig::default();
        let once = indexed(vec![a, b], &config);
        let twice = assign_indices(once.clone(), &config).unwrap();

        assert_eq!(twice.streets, once.streets);
        assert_eq!(twice.points, once.points);
        assert_eq!(twice.visual_streets, once.visual_streets);
        assert_eq!(twice.nodes, once.nodes);
    }
}

// ── End to end ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod pipeline {
    use geo::coord;

    use mcgrp_core::{CoreError, GraphState, LinkKind, NeighborhoodId, PipelineConfig, StreetId};

    use crate::error::PipelineError;
    use crate::pipeline::{NoopObserver, Pipeline, PipelineObserver, PipelineReport, Stage};

    use super::helpers::grid;

    #[derive(Default)]
    struct Recorder {
        started:  Vec<(usize, usize, Stage)>,
        streets:  Vec<usize>,
        complete: Option<PipelineReport>,
    }

    impl PipelineObserver for Recorder {
        fn on_stage_start(&mut self, step: usize, total: usize, stage: Stage) {
            self.started.push((step, total, stage));
        }

        fn on_stage_end(&mut self, _stage: Stage, state: &GraphState) {
            self.streets.push(state.streets.len());
        }

        fn on_complete(&mut self, report: &PipelineReport) {
            self.complete = Some(*report);
        }
    }

    #[test]
    fn grid_runs_to_a_valid_indexed_graph() {
        let (state, report) = Pipeline::new(PipelineConfig::default()).run(grid(), &mut NoopObserver).unwrap();
        state.check_integrity().unwrap();

        assert_eq!(
            report,
            PipelineReport { streets_before: 4, points_before: 11, streets_after: 5, points_after: 10 }
        );
        assert!(state.streets.iter().all(|s| s.coords().len() == 2));
        assert_eq!(state.nodes.len(), 6);
        // The one-way H was absorbed into a two-way merge with L.
        assert!(state.streets.iter().all(|s| s.link_kind() == LinkKind::Edge));
    }

    #[test]
    fn bend_survives_in_the_visual_table() {
        let (state, _) = Pipeline::new(PipelineConfig::default()).run(grid(), &mut NoopObserver).unwrap();
        let r1 = state.visual_street(StreetId(1)).unwrap();
        assert_eq!(r1.coords().len(), 3);
        assert_eq!(r1.coords()[1], coord! { x: 0.0035, y: 0.0052 });
        assert_eq!(state.street(StreetId(1)).unwrap().coords().len(), 2);
    }

    #[test]
    fn cross_boundary_streets_are_merged() {
        let (state, _) = Pipeline::new(PipelineConfig::default()).run(grid(), &mut NoopObserver).unwrap();
        let merged = state.street(StreetId(5)).unwrap();
        assert_eq!(merged.start(), Some(coord! { x: 0.008, y: 0.005 }));
        assert_eq!(merged.end(), Some(coord! { x: 0.018, y: 0.005 }));
        assert_eq!(merged.neighborhood_id(), Some(NeighborhoodId(2)));
        assert!((merged.total_dist_km - 1.112).abs() < 1e-3, "got {}", merged.total_dist_km);
        assert!(state.points.iter().all(|p| p.coord.x != 0.0115));
    }

    #[test]
    fn observer_sees_every_stage_in_order() {
        let mut rec = Recorder::default();
        let (_, report) = Pipeline::new(PipelineConfig::default()).run(grid(), &mut rec).unwrap();

        let stages: Vec<Stage> = rec.started.iter().map(|&(_, _, s)| s).collect();
        assert_eq!(stages, Stage::ALL);
        assert_eq!(rec.started[0].0, 1);
        assert!(rec.started.iter().all(|&(_, total, _)| total == 8));
        // normalize, explode, prune, split, collapse, two-point, merge, index
        assert_eq!(rec.streets, [4, 4, 4, 6, 6, 6, 5, 5]);
        assert_eq!(rec.complete, Some(report));
    }

    #[test]
    fn bad_config_is_rejected_before_any_stage() {
        let config = PipelineConfig { dominance_share: 1.5, ..PipelineConfig::default() };
        let mut rec = Recorder::default();
        let err = Pipeline::new(config).run(grid(), &mut rec).unwrap_err();
        assert!(matches!(err, PipelineError::Core(CoreError::Config(_))));
        assert!(rec.started.is_empty());
    }

    #[test]
    fn stage_errors_name_the_stage() {
        let err = PipelineError::InvalidInput("boom".into()).at(Stage::Index);
        assert_eq!(err.to_string(), "stage 'index' failed: invalid input: boom");
        // Wrapping twice keeps the innermost stage.
        let twice = err.at(Stage::Explode);
        assert!(matches!(twice, PipelineError::Stage { stage: Stage::Index, .. }));
    }
}
