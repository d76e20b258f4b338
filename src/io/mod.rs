//! Graph exchange formats and schema validation.

pub mod geojson;
pub mod graphml;

pub use geojson::{GraphGeoJson, graph_from_features, graph_to_geojson};
pub use graphml::{AttrType, CoercionTable, graphml_from_str, graphml_to_string, load_graphml, save_graphml};

use log::warn;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::Error;
use crate::model::StreetGraph;

/// Checks the graph against the data-model schema: finite node coordinates,
/// finite non-negative edge lengths, and non-empty edge provenance.
///
/// Returns the collected warnings in lenient mode.
///
/// # Errors
///
/// [`Error::ValidationFailed`] in strict mode when any check fails.
pub fn validate_graph(graph: &StreetGraph, strict: bool) -> Result<Vec<String>, Error> {
    let mut warnings = Vec::new();

    for idx in graph.node_indices() {
        let node = graph.node(idx);
        if !node.has_coords() {
            warnings.push(format!("node {} has non-finite coordinates", node.id));
        }
    }

    for edge_ref in graph.graph.edge_references() {
        let edge = edge_ref.weight();
        let u = graph.node_id(edge_ref.source());
        let v = graph.node_id(edge_ref.target());
        if !edge.length.is_finite() || edge.length < 0.0 {
            warnings.push(format!(
                "edge ({u}, {v}, {}) has invalid length {}",
                edge.key, edge.length
            ));
        }
        if edge.osmid.is_empty() {
            warnings.push(format!("edge ({u}, {v}, {}) has no source way id", edge.key));
        }
    }

    for warning in &warnings {
        warn!("{warning}");
    }
    if strict && !warnings.is_empty() {
        return Err(Error::ValidationFailed(format!(
            "{} problems, first: {}",
            warnings.len(),
            warnings[0]
        )));
    }
    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Crs;
    use crate::model::{StreetEdge, StreetNode};

    #[test]
    fn valid_graph_passes_strict() {
        let mut g = StreetGraph::new(Crs::wgs84());
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 1.0, 0.0));
        let mut e = StreetEdge::new(100, true);
        e.length = 1.0;
        g.add_edge(a, b, e);

        assert!(validate_graph(&g, true).is_ok());
    }

    #[test]
    fn strict_mode_promotes_warnings() {
        let mut g = StreetGraph::new(Crs::wgs84());
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 1.0, 0.0));
        g.add_edge(a, b, StreetEdge::new(100, true)); // length stays 0.0: fine
        let c = g.add_node(StreetNode::new(3, f64::NAN, 0.0));
        let mut bad = StreetEdge::new(101, true);
        bad.length = f64::NAN;
        g.add_edge(b, c, bad);

        let warnings = validate_graph(&g, false).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(matches!(
            validate_graph(&g, true),
            Err(Error::ValidationFailed(_))
        ));
    }
}
