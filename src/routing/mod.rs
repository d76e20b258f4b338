//! Routing primitives over the street multigraph.

pub mod dijkstra;
pub mod k_shortest;
pub mod speed;

pub use dijkstra::{shortest_path, shortest_paths};
pub use k_shortest::k_shortest_paths;
pub use speed::{add_edge_grades, add_edge_speeds, add_edge_travel_times};

use crate::model::{AttrValue, StreetEdge};

/// Edge-weight selector for routing. Missing, non-finite, and negative
/// values disqualify an edge; such edges are skipped and counted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Weight {
    #[default]
    Length,
    TravelTime,
    SpeedKph,
    /// Numeric passthrough tag looked up by name.
    Custom(String),
}

impl Weight {
    pub fn of(&self, edge: &StreetEdge) -> Option<f64> {
        let value = match self {
            Weight::Length => Some(edge.length),
            Weight::TravelTime => edge.travel_time,
            Weight::SpeedKph => edge.speed_kph,
            Weight::Custom(key) => edge.tags.get(key).and_then(AttrValue::as_f64),
        };
        value.filter(|v| v.is_finite() && *v >= 0.0)
    }
}
