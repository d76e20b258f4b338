//! Street network data model

pub mod components;
pub mod graph;

pub use components::{AttrValue, OsmId, StreetEdge, StreetNode};
pub use graph::{GraphMeta, StreetGraph};
