//! Street network components - nodes, edges, and their attribute values

use geo::{LineString, Point};
use hashbrown::HashMap;
use wkt::ToWkt;

/// Stable identifier of a node or way in the source map corpus.
pub type OsmId = i64;

/// Tagged attribute value. The corpus delivers every tag as a string; lists
/// appear when simplification merges differing values along a collapsed
/// chain, and JSON covers anything structured beyond that.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i64),
    Num(f64),
    Bool(bool),
    IntList(Vec<i64>),
    NumList(Vec<f64>),
    StrList(Vec<String>),
    Geometry(LineString<f64>),
    Json(serde_json::Value),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Num(n) => Some(*n),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Collapses the values seen for one attribute key along a merged chain:
    /// a single distinct value stays scalar, multiple distinct values become
    /// a list in visit order.
    pub fn merged(values: Vec<AttrValue>) -> Option<AttrValue> {
        let mut distinct: Vec<AttrValue> = Vec::new();
        for v in values {
            if !distinct.contains(&v) {
                distinct.push(v);
            }
        }
        match distinct.len() {
            0 => None,
            1 => distinct.pop(),
            _ => {
                if distinct.iter().all(|v| matches!(v, AttrValue::Str(_))) {
                    Some(AttrValue::StrList(
                        distinct
                            .into_iter()
                            .filter_map(|v| match v {
                                AttrValue::Str(s) => Some(s),
                                _ => None,
                            })
                            .collect(),
                    ))
                } else if distinct.iter().all(|v| matches!(v, AttrValue::Int(_))) {
                    Some(AttrValue::IntList(
                        distinct
                            .into_iter()
                            .filter_map(|v| match v {
                                AttrValue::Int(i) => Some(i),
                                _ => None,
                            })
                            .collect(),
                    ))
                } else if distinct
                    .iter()
                    .all(|v| matches!(v, AttrValue::Num(_) | AttrValue::Int(_)))
                {
                    Some(AttrValue::NumList(
                        distinct.into_iter().filter_map(|v| v.as_f64()).collect(),
                    ))
                } else {
                    Some(AttrValue::Json(serde_json::Value::Array(
                        distinct.into_iter().map(|v| v.to_json()).collect(),
                    )))
                }
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Value, json};
        match self {
            AttrValue::Str(s) => Value::String(s.clone()),
            AttrValue::Int(i) => json!(i),
            AttrValue::Num(n) => json!(n),
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::IntList(v) => json!(v),
            AttrValue::NumList(v) => json!(v),
            AttrValue::StrList(v) => json!(v),
            AttrValue::Geometry(line) => Value::String(line.to_wkt().to_string()),
            AttrValue::Json(v) => v.clone(),
        }
    }

    /// Best-effort typed view of a JSON property value.
    pub fn from_json(value: &serde_json::Value) -> Option<AttrValue> {
        use serde_json::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(AttrValue::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => AttrValue::Int(i),
                None => AttrValue::Num(n.as_f64()?),
            }),
            Value::String(s) => Some(AttrValue::Str(s.clone())),
            other => Some(AttrValue::Json(other.clone())),
        }
    }
}

/// Street graph node: a junction or way terminus.
///
/// `x`/`y` are longitude/latitude in a geographic CRS or easting/northing in
/// a projected one. A node retained for analysis has finite coordinates;
/// NaN marks the (rare) coordinate-less node that consolidation preserves
/// as a singleton cluster.
#[derive(Debug, Clone)]
pub struct StreetNode {
    pub id: OsmId,
    pub x: f64,
    pub y: f64,
    /// Number of physical street segments meeting at this node.
    pub street_count: Option<u32>,
    pub elevation: Option<f64>,
    /// Ids folded into this node by intersection consolidation.
    pub merged_nodes: Option<Vec<OsmId>>,
    /// Passthrough corpus tags (`highway`, `ref`, ...).
    pub tags: HashMap<String, AttrValue>,
}

impl StreetNode {
    pub fn new(id: OsmId, x: f64, y: f64) -> Self {
        Self {
            id,
            x,
            y,
            street_count: None,
            elevation: None,
            merged_nodes: None,
            tags: HashMap::new(),
        }
    }

    pub fn point(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }

    pub fn has_coords(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Street graph edge: a directed road segment. Parallel edges between the
/// same ordered node pair are distinguished by `key`.
#[derive(Debug, Clone)]
pub struct StreetEdge {
    /// Way id(s) this edge derives from; more than one after simplification.
    pub osmid: Vec<OsmId>,
    /// Opaque per-(u, v) key assigned at insertion.
    pub key: u32,
    /// Segment length in meters.
    pub length: f64,
    pub oneway: bool,
    /// True on the reciprocal twin emitted for a bidirectional way.
    pub reversed: bool,
    /// Stored geometry in the graph CRS; absent edges are straight lines
    /// between their endpoint coordinates.
    pub geometry: Option<LineString<f64>>,
    pub speed_kph: Option<f64>,
    /// Traversal time in seconds.
    pub travel_time: Option<f64>,
    pub grade: Option<f64>,
    /// Compass bearing of the straight endpoint-to-endpoint direction.
    pub bearing: Option<f64>,
    /// Original `(u, v)` constituent pairs recorded by simplification.
    pub merged_edges: Option<Vec<(OsmId, OsmId)>>,
    /// Passthrough corpus tags (`highway`, `maxspeed`, `name`, ...).
    pub tags: HashMap<String, AttrValue>,
}

impl StreetEdge {
    pub fn new(osmid: OsmId, oneway: bool) -> Self {
        Self {
            osmid: vec![osmid],
            key: 0,
            length: 0.0,
            oneway,
            reversed: false,
            geometry: None,
            speed_kph: None,
            travel_time: None,
            grade: None,
            bearing: None,
            merged_edges: None,
            tags: HashMap::new(),
        }
    }
}
