//! Display labels for streets and nodes.
//!
//! Missing values never fail a label; they print as [`PLACEHOLDER`].

use mcgrp_core::{LinkIndex, NodeRecord, StreetRecord};

pub const PLACEHOLDER: &str = "N/A";

/// `"1.235 km"`, or the placeholder for a missing or non-finite distance.
pub fn format_distance(km: Option<f64>) -> String {
    match km {
        Some(km) if km.is_finite() => format!("{km:.3} km"),
        _ => PLACEHOLDER.to_owned(),
    }
}

/// Multi-line label of a street: link, name, neighborhood, length and
/// traversal cost.
pub fn street_label(street: &StreetRecord) -> String {
    let header = match street.link {
        Some(LinkIndex::Edge(e)) => format!("Edge: {}", e.get()),
        Some(LinkIndex::Arc(a)) => format!(
            "Arc: {} (from {}, to {})",
            a.get(),
            or_placeholder(street.from_node.map(|n| n.get())),
            or_placeholder(street.to_node.map(|n| n.get())),
        ),
        None => format!("Street: {}", street.id.get()),
    };
    let name = street.tags.name.as_deref().unwrap_or("unknown");
    let neighborhood = street
        .neighborhood
        .as_ref()
        .and_then(|n| n.name.as_deref())
        .unwrap_or(PLACEHOLDER);

    [
        header,
        format!("Street name: {name}"),
        format!("Neighborhood: {neighborhood}"),
        format!("Length: {}", format_distance(Some(street.total_dist_km))),
        format!("Traversal cost: {} s", street.traversal_cost),
    ]
    .join("\n")
}

/// Label of a node: the depot shows only its index, other nodes add their
/// service cost.
pub fn node_label(node: &NodeRecord) -> String {
    let index = node.node_index.map_or_else(|| "?".to_owned(), |n| n.get().to_string());
    if node.service.depot {
        return format!("Depot: {index}");
    }
    format!("Node: {index}\nService cost: {} s", node.service.service_cost)
}

fn or_placeholder(value: Option<u32>) -> String {
    value.map_or_else(|| PLACEHOLDER.to_owned(), |v| v.to_string())
}
