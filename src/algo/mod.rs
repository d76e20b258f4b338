//! Graph transformation and analysis algorithms.

pub mod components;
pub mod consolidate;
pub mod simplify;
pub mod stats;
pub mod truncate;

pub use components::largest_component;
pub use consolidate::consolidate_intersections;
pub use simplify::{SimplifyOptions, is_endpoint, simplify_graph};
pub use truncate::{truncate_by_bbox, truncate_by_distance, truncate_by_polygon};
