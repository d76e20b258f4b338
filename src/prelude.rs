// Re-export key components
pub use crate::algo::{
    SimplifyOptions, consolidate_intersections, largest_component, simplify_graph,
    truncate_by_bbox, truncate_by_distance, truncate_by_polygon,
};
pub use crate::geometry::{Bbox, Crs};
pub use crate::index::{NodeLocator, nearest_edge, nearest_edges};
pub use crate::io::{
    CoercionTable, graph_from_features, graph_to_geojson, graphml_from_str, graphml_to_string,
    load_graphml, save_graphml, validate_graph,
};
pub use crate::loading::{BuildOptions, Settings, graph_from_elements, graph_from_xml};
pub use crate::routing::{
    Weight, add_edge_grades, add_edge_speeds, add_edge_travel_times, k_shortest_paths,
    shortest_path, shortest_paths,
};

// Core types for the street graph
pub use crate::model::{AttrValue, OsmId, StreetEdge, StreetGraph, StreetNode};

pub use crate::Error;
