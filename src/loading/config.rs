//! Immutable build-time configuration.

/// Configuration consumed by the graph builder and its collaborators.
///
/// Passed by reference into constructors; never mutated after creation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// CRS code stamped on freshly built graphs.
    pub default_crs: String,
    /// Treat every way as oneway regardless of its tags.
    pub all_oneway: bool,
    /// Network types whose ways are always traversable in both directions.
    pub bidirectional_network_types: Vec<String>,
    /// Node tags copied from the corpus onto graph nodes.
    pub useful_tags_node: Vec<String>,
    /// Way tags copied from the corpus onto graph edges.
    pub useful_tags_way: Vec<String>,
    /// Ceiling on the area (square meters) of a single query polygon.
    pub max_query_area_size: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_crs: "epsg:4326".to_string(),
            all_oneway: false,
            bidirectional_network_types: vec!["walk".to_string()],
            useful_tags_node: ["ref", "highway"].map(String::from).to_vec(),
            useful_tags_way: [
                "bridge", "tunnel", "oneway", "lanes", "ref", "name", "highway", "maxspeed",
                "service", "access", "area", "landuse", "width", "est_width", "junction",
            ]
            .map(String::from)
            .to_vec(),
            max_query_area_size: 50_000.0 * 50_000.0,
        }
    }
}
