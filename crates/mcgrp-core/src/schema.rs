//! Typed street, point, node and neighborhood records.
//!
//! Every record is fully populated at construction: `new` fills the
//! documented defaults, so later stages never have to check whether a field
//! "exists".  Attribute inheritance between records is plain field copying
//! (see [`PointRecord::inherit_from`]).

use std::fmt;

use geo::{Coord, LineString, MultiPolygon};

use crate::error::{CoreError, CoreResult};
use crate::ids::{ArcIndex, EdgeIndex, NeighborhoodId, NodeIndex, StreetId};

// ── Street tags ──────────────────────────────────────────────────────────────

/// Source tags carried over from the raw street layer.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreetTags {
    pub osm_id:   Option<String>,
    pub osm_type: Option<String>,
    pub highway:  Option<String>,
    pub maxspeed: Option<String>,
    pub oneway:   Option<String>,
    pub lanes:    Option<String>,
    pub surface:  Option<String>,
    pub name:     Option<String>,
    pub alt_name: Option<String>,
}

impl StreetTags {
    /// `true` for `oneway` values `yes`, `1` or `true` (any case).  A missing
    /// tag reads as `no`.
    pub fn is_oneway(&self) -> bool {
        self.oneway
            .as_deref()
            .map(|v| v.trim().to_ascii_lowercase())
            .is_some_and(|v| matches!(v.as_str(), "yes" | "1" | "true"))
    }

    /// Edge or arc, as implied by the `oneway` tag.
    pub fn link_kind(&self) -> LinkKind {
        if self.is_oneway() { LinkKind::Arc } else { LinkKind::Edge }
    }
}

// ── Neighborhood membership ──────────────────────────────────────────────────

/// The neighborhood a street or point belongs to.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeighborhoodRef {
    pub id:   NeighborhoodId,
    pub name: Option<String>,
}

impl NeighborhoodRef {
    pub fn new(id: NeighborhoodId, name: impl Into<String>) -> Self {
        Self { id, name: Some(name.into()) }
    }
}

/// A neighborhood polygon.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Neighborhood {
    pub id:      NeighborhoodId,
    pub name:    String,
    pub polygon: MultiPolygon<f64>,
}

impl Neighborhood {
    pub fn membership(&self) -> NeighborhoodRef {
        NeighborhoodRef { id: self.id, name: Some(self.name.clone()) }
    }
}

// ── Edge / arc ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkKind {
    /// Traversable both ways at the same cost.
    Edge,
    /// Traversable only from `from_node` to `to_node`.
    Arc,
}

/// The index a street holds in exactly one of the two series.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkIndex {
    Edge(EdgeIndex),
    Arc(ArcIndex),
}

impl LinkIndex {
    pub fn kind(self) -> LinkKind {
        match self {
            LinkIndex::Edge(_) => LinkKind::Edge,
            LinkIndex::Arc(_) => LinkKind::Arc,
        }
    }
}

// ── StreetRecord ─────────────────────────────────────────────────────────────

/// A logical or visual street.
///
/// Both tables of a [`GraphState`](crate::GraphState) use this type; they
/// differ only in `geometry` (straight two-point segment vs. the curved
/// source polyline).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreetRecord {
    pub id:             StreetId,
    pub geometry:       LineString<f64>,
    pub tags:           StreetTags,
    pub neighborhood:   Option<NeighborhoodRef>,
    /// Length in kilometres.
    pub total_dist_km:  f64,
    pub link:           Option<LinkIndex>,
    pub from_node:      Option<NodeIndex>,
    pub to_node:        Option<NodeIndex>,
    /// Seconds.
    pub traversal_cost: u32,
    pub service_cost:   u32,
    pub required:       bool,
    /// 0 or 1, mirrors `required`.
    pub demand:         u32,
}

impl StreetRecord {
    pub fn new(id: StreetId, geometry: LineString<f64>, tags: StreetTags) -> Self {
        Self {
            id,
            geometry,
            tags,
            neighborhood:   None,
            total_dist_km:  0.0,
            link:           None,
            from_node:      None,
            to_node:        None,
            traversal_cost: 0,
            service_cost:   0,
            required:       false,
            demand:         0,
        }
    }

    /// Kind of the assigned index, or the kind implied by `oneway` when the
    /// street is not indexed yet.
    pub fn link_kind(&self) -> LinkKind {
        match self.link {
            Some(link) => link.kind(),
            None => self.tags.link_kind(),
        }
    }

    pub fn edge_index(&self) -> Option<EdgeIndex> {
        match self.link {
            Some(LinkIndex::Edge(e)) => Some(e),
            _ => None,
        }
    }

    pub fn arc_index(&self) -> Option<ArcIndex> {
        match self.link {
            Some(LinkIndex::Arc(a)) => Some(a),
            _ => None,
        }
    }

    pub fn coords(&self) -> &[Coord] {
        &self.geometry.0
    }

    pub fn start(&self) -> Option<Coord> {
        self.geometry.0.first().copied()
    }

    pub fn end(&self) -> Option<Coord> {
        self.geometry.0.last().copied()
    }

    pub fn neighborhood_id(&self) -> Option<NeighborhoodId> {
        self.neighborhood.as_ref().map(|n| n.id)
    }

    /// Set the requirement flag and the demand that mirrors it.
    pub fn set_required(&mut self, required: bool) {
        self.required = required;
        self.demand = required as u32;
    }

    /// Clear everything the indexer assigns.
    pub fn reset_indexing(&mut self) {
        self.link = None;
        self.from_node = None;
        self.to_node = None;
        self.traversal_cost = 0;
        self.service_cost = 0;
    }
}

// ── Node service state ───────────────────────────────────────────────────────

/// Requirement and depot state of a node.
///
/// Stored on the node record and copied onto every point with the same
/// node index; [`GraphState::set_node_service`](crate::GraphState::set_node_service)
/// keeps the copies equal.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeService {
    pub required:     bool,
    pub depot:        bool,
    pub demand:       u32,
    pub service_cost: u32,
}

impl NodeService {
    /// A required node with demand 1 and the given service cost.
    pub fn required(service_cost: u32) -> Self {
        Self { required: true, depot: false, demand: 1, service_cost }
    }

    /// The depot: not required, no demand, no service cost.
    pub fn depot() -> Self {
        Self { required: false, depot: true, demand: 0, service_cost: 0 }
    }

    /// Required and not the depot.
    pub fn is_serviced(&self) -> bool {
        self.required && !self.depot
    }
}

// ── PointRecord ──────────────────────────────────────────────────────────────

/// One vertex of a logical street.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointRecord {
    pub coord:        Coord,
    pub street_id:    StreetId,
    /// Position along the street, 0-based.
    pub vertex_index: u32,
    /// Vertex the `distance_km` is measured from.
    pub vertex_to:    u32,
    pub distance_km:  f64,
    /// Bearing to the next vertex; `None` at the last vertex.
    pub angle:        Option<f64>,
    pub angle_inv:    Option<f64>,
    /// Another point has the same rounded coordinate.
    pub shared:       bool,
    pub endpoint:     bool,
    /// Created by an interactive split; removing it merges the two streets.
    pub inserted:     bool,
    pub name:         Option<String>,
    pub alt_name:     Option<String>,
    pub neighborhood: Option<NeighborhoodRef>,
    pub node_index:   Option<NodeIndex>,
    pub service:      NodeService,
}

impl PointRecord {
    pub fn new(coord: Coord, street_id: StreetId, vertex_index: u32) -> Self {
        Self {
            coord,
            street_id,
            vertex_index,
            vertex_to:    0,
            distance_km:  0.0,
            angle:        None,
            angle_inv:    None,
            shared:       false,
            endpoint:     false,
            inserted:     false,
            name:         None,
            alt_name:     None,
            neighborhood: None,
            node_index:   None,
            service:      NodeService::default(),
        }
    }

    /// Copy name and neighborhood from the owning street.
    pub fn inherit_from(mut self, street: &StreetRecord) -> Self {
        self.name = street.tags.name.clone();
        self.alt_name = street.tags.alt_name.clone();
        self.neighborhood = street.neighborhood.clone();
        self
    }

    pub fn neighborhood_id(&self) -> Option<NeighborhoodId> {
        self.neighborhood.as_ref().map(|n| n.id)
    }

    pub fn clear_angles(&mut self) {
        self.angle = None;
        self.angle_inv = None;
    }
}

// ── NodeRecord ───────────────────────────────────────────────────────────────

/// A visual point: one per distinct rounded coordinate of the logical
/// points.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    pub coord:        Coord,
    pub node_index:   Option<NodeIndex>,
    /// Logical streets with a point here, in point order.
    pub street_ids:   Vec<StreetId>,
    pub shared:       bool,
    pub inserted:     bool,
    pub neighborhood: Option<NeighborhoodRef>,
    pub service:      NodeService,
}

impl NodeRecord {
    pub fn from_point(p: &PointRecord) -> Self {
        Self {
            coord:        p.coord,
            node_index:   p.node_index,
            street_ids:   vec![p.street_id],
            shared:       p.shared,
            inserted:     p.inserted,
            neighborhood: p.neighborhood.clone(),
            service:      p.service,
        }
    }

    pub fn neighborhood_id(&self) -> Option<NeighborhoodId> {
        self.neighborhood.as_ref().map(|n| n.id)
    }
}

// ── Coordinate reference system ──────────────────────────────────────────────

/// Coordinate reference system identifier of a state.
///
/// Only geographic WGS-84 input is accepted.  Projected inputs are refused
/// rather than reprojected; metric work is done in Web Mercator internally.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Crs(String);

impl Crs {
    pub const WGS84: &'static str = "EPSG:4326";
    pub const WEB_MERCATOR: &'static str = "EPSG:3857";

    pub fn wgs84() -> Self {
        Crs(Self::WGS84.to_owned())
    }

    /// Accept the usual spellings of WGS-84 and normalise them.
    pub fn parse(code: &str) -> CoreResult<Self> {
        let normalized = code.trim().to_ascii_uppercase().replace(' ', "");
        match normalized.as_str() {
            "EPSG:4326" | "EPSG::4326" | "OGC:CRS84" | "CRS84" | "WGS84" | "4326" => Ok(Self::wgs84()),
            _ => Err(CoreError::UnsupportedCrs(code.to_owned())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::wgs84()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
