//! Connected-component extraction.

use hashbrown::{HashMap, HashSet};
use log::info;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};

use crate::model::StreetGraph;

/// Weakly connected components: components of the symmetric closure of the
/// edge set. Components are listed in order of their first node (ascending
/// node-index order), members likewise.
pub fn weakly_connected_components(graph: &StreetGraph) -> Vec<Vec<NodeIndex>> {
    let mut union = UnionFind::<usize>::new(graph.graph.node_bound());
    for edge in graph.graph.edge_references() {
        union.union(edge.source().index(), edge.target().index());
    }

    let mut components: Vec<Vec<NodeIndex>> = Vec::new();
    let mut root_pos: HashMap<usize, usize> = HashMap::new();
    for node in graph.node_indices() {
        let root = union.find(node.index());
        match root_pos.get(&root) {
            Some(&pos) => components[pos].push(node),
            None => {
                root_pos.insert(root, components.len());
                components.push(vec![node]);
            }
        }
    }
    components
}

/// Strongly connected components via Tarjan's algorithm, canonicalized to
/// the same ordering convention as the weak variant.
pub fn strongly_connected_components(graph: &StreetGraph) -> Vec<Vec<NodeIndex>> {
    let mut components = tarjan_scc(&graph.graph);
    for component in &mut components {
        component.sort_by_key(|n| n.index());
    }
    components.sort_by_key(|component| component[0].index());
    components
}

/// Subgraph induced by the largest (by node count) weakly or strongly
/// connected component. Ties go to the component found first. An empty
/// graph comes back empty.
pub fn largest_component(graph: &StreetGraph, strongly: bool) -> StreetGraph {
    let components = if strongly {
        strongly_connected_components(graph)
    } else {
        weakly_connected_components(graph)
    };

    let mut best: Option<&Vec<NodeIndex>> = None;
    for component in &components {
        if best.is_none_or(|b| component.len() > b.len()) {
            best = Some(component);
        }
    }

    match best {
        Some(component) => {
            let keep: HashSet<NodeIndex> = component.iter().copied().collect();
            let sub = graph.subgraph(&keep);
            info!(
                "largest {} component: {} of {} nodes",
                if strongly { "strongly" } else { "weakly" },
                sub.node_count(),
                graph.node_count()
            );
            sub
        }
        None => graph.empty_like(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Crs;
    use crate::model::{OsmId, StreetEdge, StreetNode};

    fn graph_with_edges(nodes: &[OsmId], edges: &[(OsmId, OsmId)]) -> StreetGraph {
        let mut g = StreetGraph::new(Crs::wgs84());
        for &id in nodes {
            g.add_node(StreetNode::new(id, id as f64, 0.0));
        }
        for &(u, v) in edges {
            let ui = g.node_index(u).unwrap();
            let vi = g.node_index(v).unwrap();
            let mut e = StreetEdge::new(0, true);
            e.length = 1.0;
            g.add_edge(ui, vi, e);
        }
        g
    }

    #[test]
    fn weak_components_ignore_direction() {
        let g = graph_with_edges(&[1, 2, 3, 4, 5], &[(1, 2), (3, 2), (4, 5)]);
        let components = weakly_connected_components(&g);
        assert_eq!(components.len(), 2);
        assert_eq!(components[0].len(), 3);
        assert_eq!(components[1].len(), 2);
    }

    #[test]
    fn strong_components_respect_direction() {
        // 1 <-> 2, one-directional tail 2 -> 3
        let g = graph_with_edges(&[1, 2, 3], &[(1, 2), (2, 1), (2, 3)]);
        let components = strongly_connected_components(&g);
        assert_eq!(components.len(), 2);
        let sizes: Vec<usize> = components.iter().map(Vec::len).collect();
        assert!(sizes.contains(&2) && sizes.contains(&1));
    }

    #[test]
    fn largest_weak_component_is_extracted() {
        let g = graph_with_edges(&[1, 2, 3, 4, 5], &[(1, 2), (2, 3), (4, 5)]);
        let largest = largest_component(&g, false);
        assert_eq!(largest.node_count(), 3);
        assert_eq!(largest.edge_count(), 2);
        assert!(largest.node_index(4).is_none());
    }

    #[test]
    fn largest_strong_component() {
        let g = graph_with_edges(
            &[1, 2, 3, 4],
            &[(1, 2), (2, 3), (3, 1), (3, 4)],
        );
        let largest = largest_component(&g, true);
        assert_eq!(largest.node_count(), 3);
        assert!(largest.node_index(4).is_none());
    }

    #[test]
    fn isolated_nodes_are_their_own_components() {
        let g = graph_with_edges(&[1, 2, 3], &[(1, 2)]);
        let components = weakly_connected_components(&g);
        assert_eq!(components.len(), 2);
        let largest = largest_component(&g, false);
        assert_eq!(largest.node_count(), 2);
    }
}
