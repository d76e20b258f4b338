//! Street-network graphs from crowd-sourced map data.
//!
//! The pipeline turns raw map elements into a directed multigraph of road
//! junctions and segments, then keeps it consistent under topological
//! simplification, intersection consolidation, spatial truncation, routing,
//! and morphometric analysis. Fetching, geocoding, and projection are
//! collaborator contracts (see [`loading`]); everything here is pure graph
//! work.

pub mod algo;
pub mod error;
pub mod geometry;
pub mod index;
pub mod io;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;
pub use geometry::{Bbox, Crs, EARTH_RADIUS_M};
pub use model::{AttrValue, OsmId, StreetEdge, StreetGraph, StreetNode};

/// `oneway` tag values marking a way as one-directional.
pub const ONEWAY_VALUES: [&str; 7] = ["yes", "true", "1", "-1", "reverse", "T", "F"];

/// `oneway` tag values whose node sequence runs against travel direction.
pub const REVERSED_ONEWAY_VALUES: [&str; 3] = ["-1", "reverse", "T"];
