//! Unit tests for mcgrp-core primitives.

#[cfg(test)]
pub(crate) mod helpers {
    use geo::{coord, LineString};

    use crate::{
        EdgeIndex, ArcIndex, GraphState, LinkIndex, NodeIndex, PointRecord, StreetId, StreetRecord,
        StreetTags,
    };

    /// Two indexed streets A→B (edge 1) and B→C (one-way, arc 1) along the
    /// equator, nodes 1, 2, 3.
    pub fn two_street_state() -> GraphState {
        let a = coord! { x: 0.0, y: 0.0 };
        let b = coord! { x: 0.001, y: 0.0 };
        let c = coord! { x: 0.002, y: 0.0 };

        let mut state = GraphState::default();

        let mut s1 = StreetRecord::new(StreetId(1), LineString::from(vec![a, b]), StreetTags::default());
        s1.link = Some(LinkIndex::Edge(EdgeIndex(1)));
        s1.from_node = Some(NodeIndex(1));
        s1.to_node = Some(NodeIndex(2));

        let tags = StreetTags { oneway: Some("yes".into()), ..StreetTags::default() };
        let mut s2 = StreetRecord::new(StreetId(2), LineString::from(vec![b, c]), tags);
        s2.link = Some(LinkIndex::Arc(ArcIndex(1)));
        s2.from_node = Some(NodeIndex(2));
        s2.to_node = Some(NodeIndex(3));

        for (street, (start, end), (n0, n1)) in [(StreetId(1), (a, b), (1, 2)), (StreetId(2), (b, c), (2, 3))] {
            let mut p0 = PointRecord::new(start, street, 0);
            p0.node_index = Some(NodeIndex(n0));
            p0.endpoint = true;
            let mut p1 = PointRecord::new(end, street, 1);
            p1.node_index = Some(NodeIndex(n1));
            p1.endpoint = true;
            state.points.push(p0);
            state.points.push(p1);
        }

        state.streets = vec![s1, s2];
        state.mirror_visual_streets();
        state.rebuild_nodes();
        state
    }
}

#[cfg(test)]
mod ids {
    use crate::{DenseId, NodeIndex, StreetId};

    #[test]
    fn display() {
        assert_eq!(StreetId(7).to_string(), "StreetId(7)");
        assert_eq!(NodeIndex(3).to_string(), "NodeIndex(3)");
    }

    #[test]
    fn dense_helpers() {
        assert_eq!(StreetId::from_ordinal(4), StreetId(4));
        assert_eq!(NodeIndex(9).next(), NodeIndex(10));
        assert_eq!(StreetId::try_from(12usize).unwrap(), StreetId(12));
    }
}

#[cfg(test)]
mod geodesy {
    use geo::coord;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    use crate::geodesy::*;

    #[test]
    fn one_degree_of_latitude() {
        let a = coord! { x: -46.6, y: -23.0 };
        let b = coord! { x: -46.6, y: -22.0 };
        let d = haversine_distance(a, b);
        assert!((d - 111_194.926_645).abs() < 0.01, "got {d}");
    }

    #[test]
    fn distance_is_rounded() {
        let a = coord! { x: 0.0, y: 0.0 };
        let b = coord! { x: 0.000_123_4, y: 0.000_567_8 };
        let d = haversine_distance(a, b);
        assert_eq!(d, round6(d));
    }

    #[test]
    fn cardinal_bearings() {
        let o = coord! { x: 0.0, y: 0.0 };
        assert!(azimuth(o, coord! { x: 0.0, y: 1.0 }).abs() < 1e-9);
        assert!((azimuth(o, coord! { x: 1.0, y: 0.0 }) - 90.0).abs() < 1e-9);
        assert!((azimuth(o, coord! { x: 0.0, y: -1.0 }) - 180.0).abs() < 1e-9);
        assert!((azimuth(o, coord! { x: -1.0, y: 0.0 }) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn inverse_is_an_involution() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let a: f64 = rng.gen_range(0.0..360.0);
            let back = azimuth_inverse(azimuth_inverse(a));
            let d = (back - a).rem_euclid(360.0);
            assert!(d < 1e-9 || 360.0 - d < 1e-9, "{a} came back as {back}");
        }
        assert_eq!(azimuth_inverse(90.0), 270.0);
        assert_eq!(azimuth_inverse(270.0), 90.0);
        assert_eq!(azimuth_inverse(180.0), 0.0);
    }

    #[test]
    fn circular_mean() {
        assert_eq!(mean_angle_deg(Vec::<f64>::new()), None);

        let m = mean_angle_deg([90.0, 180.0]).unwrap();
        assert!((m - 135.0).abs() < 1e-9, "got {m}");

        // Wraps around north instead of averaging to 180.
        let m = mean_angle_deg([350.0, 10.0]).unwrap();
        assert!(m < 1e-9 || 360.0 - m < 1e-9, "got {m}");
        assert!(m < 360.0);
    }

    #[test]
    fn traversal_cost_formula() {
        assert_eq!(calculate_traversal_cost(Some(10.0), Some("30")), 1800);
        assert_eq!(calculate_traversal_cost(Some(0.0), Some("50")), 0);
        assert_eq!(calculate_traversal_cost(Some(5.0), Some("abc")), 900);
        assert_eq!(calculate_traversal_cost(None, Some("50")), 0);
        assert_eq!(calculate_traversal_cost(Some(1.0), Some("10")), 360);
        assert_eq!(calculate_traversal_cost(Some(1.0), Some("0")), 180);
        assert_eq!(calculate_traversal_cost(Some(1.0), None), 180);
    }

    #[test]
    fn speed_uses_first_digit_run() {
        assert_eq!(parse_speed_kmh("50 mph"), Some(50));
        assert_eq!(parse_speed_kmh("BR:urban 40; 60"), Some(40));
        assert_eq!(parse_speed_kmh("none"), None);
    }

    #[test]
    fn service_cost_rounds_up() {
        assert_eq!(service_cost(1800), 2700);
        assert_eq!(service_cost(7), 11);
        assert_eq!(service_cost(0), 0);
    }

    #[test]
    fn proximity() {
        let a = coord! { x: -46.6, y: -23.5 };
        let near = coord! { x: -46.6, y: -23.500_005 }; // ~0.56 m
        let far = coord! { x: -46.6, y: -23.500_02 };   // ~2.2 m
        assert!(are_coords_close(a, near));
        assert!(!are_coords_close(a, far));
    }

    #[test]
    fn coord_key_rounds_to_six_digits() {
        let a = coord! { x: 1.000_000_01, y: 2.0 };
        let b = coord! { x: 1.000_000_04, y: 2.0 };
        let c = coord! { x: 1.000_001, y: 2.0 };
        assert_eq!(CoordKey::of(a), CoordKey::of(b));
        assert_ne!(CoordKey::of(a), CoordKey::of(c));
    }

    #[test]
    fn polyline_length_sums_legs() {
        let pts = [
            coord! { x: 0.0, y: 0.0 },
            coord! { x: 0.0, y: 0.001 },
            coord! { x: 0.0, y: 0.002 },
        ];
        let total = polyline_length_m(&pts);
        let direct = haversine_distance(pts[0], pts[2]);
        assert!((total - direct).abs() < 1e-5);
    }
}

#[cfg(test)]
mod reindex {
    use crate::{reindex, reindex_sorted, NodeIndex, StreetId};

    #[test]
    fn renumbers_in_order() {
        let (new_ids, map) = reindex([StreetId(5), StreetId(2), StreetId(9)]);
        assert_eq!(new_ids, vec![StreetId(1), StreetId(2), StreetId(3)]);
        assert_eq!(map.get(StreetId(5)), Some(StreetId(1)));
        assert_eq!(map.get(StreetId(9)), Some(StreetId(3)));
        assert_eq!(map.get(StreetId(4)), None);
        assert!(!map.is_identity());
    }

    #[test]
    fn identity_when_already_dense() {
        let (_, map) = reindex([StreetId(1), StreetId(2)]);
        assert!(map.is_identity());
    }

    #[test]
    fn sorted_unique() {
        let map = reindex_sorted([NodeIndex(7), NodeIndex(3), NodeIndex(7)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(NodeIndex(3)), Some(NodeIndex(1)));
        assert_eq!(map.get(NodeIndex(7)), Some(NodeIndex(2)));
    }
}

#[cfg(test)]
mod state {
    use rustc_hash::FxHashSet;

    use super::helpers::two_street_state;
    use crate::{ArcIndex, EdgeIndex, LinkIndex, NodeIndex, NodeService, StreetId};

    #[test]
    fn fixture_is_consistent() {
        let state = two_street_state();
        state.check_integrity().unwrap();
        assert_eq!(state.nodes.len(), 3);
        assert_eq!(state.nodes[1].street_ids, vec![StreetId(1), StreetId(2)]);
    }

    #[test]
    fn allocation_helpers() {
        let state = two_street_state();
        assert_eq!(state.next_street_id(), StreetId(3));
        assert_eq!(state.next_edge_index(), EdgeIndex(2));
        assert_eq!(state.next_arc_index(), ArcIndex(2));
        assert_eq!(state.next_node_index(), NodeIndex(4));
    }

    #[test]
    fn node_service_reaches_points_and_nodes() {
        let mut state = two_street_state();
        assert!(state.set_node_service(NodeIndex(2), NodeService::required(30)));
        let flagged = state.points.iter().filter(|p| p.service.required).count();
        assert_eq!(flagged, 2);
        assert_eq!(state.node(NodeIndex(2)).unwrap().service.service_cost, 30);
        assert!(!state.set_node_service(NodeIndex(99), NodeService::depot()));
    }

    #[test]
    fn rebuild_keeps_service() {
        let mut state = two_street_state();
        state.set_node_service(NodeIndex(1), NodeService::depot());
        state.rebuild_nodes();
        assert_eq!(state.depot_node(), Some(NodeIndex(1)));
        assert!(state.node(NodeIndex(1)).unwrap().service.depot);
    }

    #[test]
    fn reindex_after_removal() {
        let mut state = two_street_state();
        let gone: FxHashSet<StreetId> = [StreetId(1)].into_iter().collect();
        state.remove_streets(&gone);
        let map = state.reindex_streets();

        assert_eq!(map.get(StreetId(2)), Some(StreetId(1)));
        assert_eq!(state.streets[0].id, StreetId(1));
        assert_eq!(state.visual_streets[0].id, StreetId(1));
        assert!(state.points.iter().all(|p| p.street_id == StreetId(1)));
        assert_eq!(state.points.len(), 2);
    }

    #[test]
    fn integrity_detects_gaps() {
        let mut state = two_street_state();
        state.streets[0].link = Some(LinkIndex::Edge(EdgeIndex(2)));
        assert!(state.check_integrity().is_err());
    }

    #[test]
    fn integrity_detects_two_depots() {
        let mut state = two_street_state();
        state.set_node_service(NodeIndex(1), NodeService::depot());
        state.set_node_service(NodeIndex(3), NodeService::depot());
        assert!(state.check_integrity().is_err());
    }

    #[test]
    fn integrity_detects_misaligned_visual_table() {
        let mut state = two_street_state();
        state.visual_streets.swap(0, 1);
        assert!(state.check_integrity().is_err());
    }
}

#[cfg(test)]
mod schema {
    use crate::{Crs, LinkKind, PipelineConfig, PointRecord, SplitCriteria, StreetId, StreetTags};
    use geo::coord;

    #[test]
    fn oneway_values() {
        for v in ["yes", "YES", "1", "true", " True "] {
            let tags = StreetTags { oneway: Some(v.into()), ..StreetTags::default() };
            assert_eq!(tags.link_kind(), LinkKind::Arc, "{v}");
        }
        for v in [Some("no"), Some("-1"), None] {
            let tags = StreetTags { oneway: v.map(Into::into), ..StreetTags::default() };
            assert_eq!(tags.link_kind(), LinkKind::Edge);
        }
    }

    #[test]
    fn crs_aliases() {
        assert_eq!(Crs::parse("epsg:4326").unwrap(), Crs::wgs84());
        assert_eq!(Crs::parse("OGC:CRS84").unwrap().as_str(), "EPSG:4326");
        assert!(Crs::parse("EPSG:31983").is_err());
    }

    #[test]
    fn split_criteria() {
        let mut p = PointRecord::new(coord! { x: 0.0, y: 0.0 }, StreetId(1), 3);
        assert!(!SplitCriteria::default().matches(&p));
        p.shared = true;
        assert!(SplitCriteria::default().matches(&p));
        assert!(!SplitCriteria::NONE.matches(&p));
        assert!(SplitCriteria::NONE.is_empty());
    }

    #[test]
    fn config_validation() {
        PipelineConfig::default().validate().unwrap();
        let bad = PipelineConfig { dominance_share: 1.0, ..PipelineConfig::default() };
        assert!(bad.validate().is_err());
    }
}
