//! Directed multigraph over street nodes and edges.

use chrono::Utc;
use hashbrown::{HashMap, HashSet};
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::geometry::Crs;
use crate::model::{OsmId, StreetEdge, StreetNode};

/// Graph-level attributes.
#[derive(Debug, Clone)]
pub struct GraphMeta {
    pub crs: Crs,
    pub simplified: bool,
    /// ISO-8601 UTC timestamp stamped at construction.
    pub created_date: String,
    /// Product tag of the builder.
    pub created_with: String,
}

impl GraphMeta {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            simplified: false,
            created_date: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            created_with: format!("viarium {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Directed street multigraph.
///
/// Nodes and edges live in a [`StableDiGraph`] so that indices stay valid
/// across removals; the public identity of a node is its corpus id, mapped
/// through `node_ids`. Parallel edges between the same ordered pair are
/// permitted and distinguished by the per-pair `key` stamped at insertion.
///
/// The graph exclusively owns its attribute stores and is not safe for
/// concurrent mutation. Iteration order over nodes and edges is ascending
/// index order, which is stable within one graph version.
#[derive(Debug, Clone)]
pub struct StreetGraph {
    pub graph: StableDiGraph<StreetNode, StreetEdge>,
    node_ids: HashMap<OsmId, NodeIndex>,
    pub meta: GraphMeta,
}

impl StreetGraph {
    pub fn new(crs: Crs) -> Self {
        Self {
            graph: StableDiGraph::default(),
            node_ids: HashMap::new(),
            meta: GraphMeta::new(crs),
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a node, replacing the attributes of an existing node with the
    /// same corpus id.
    pub fn add_node(&mut self, node: StreetNode) -> NodeIndex {
        match self.node_ids.get(&node.id) {
            Some(&idx) => {
                self.graph[idx] = node;
                idx
            }
            None => {
                let id = node.id;
                let idx = self.graph.add_node(node);
                self.node_ids.insert(id, idx);
                idx
            }
        }
    }

    /// Removes a node and all incident edges.
    pub fn remove_node(&mut self, idx: NodeIndex) -> Option<StreetNode> {
        let node = self.graph.remove_node(idx)?;
        self.node_ids.remove(&node.id);
        Some(node)
    }

    pub fn node_index(&self, id: OsmId) -> Option<NodeIndex> {
        self.node_ids.get(&id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &StreetNode {
        &self.graph[idx]
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> &mut StreetNode {
        &mut self.graph[idx]
    }

    pub fn node_id(&self, idx: NodeIndex) -> OsmId {
        self.graph[idx].id
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Inserts a directed edge and returns its parallel-edge key: the
    /// smallest non-negative integer not already used between `(u, v)`.
    pub fn add_edge(&mut self, u: NodeIndex, v: NodeIndex, mut edge: StreetEdge) -> u32 {
        let used: HashSet<u32> = self
            .graph
            .edges_connecting(u, v)
            .map(|e| e.weight().key)
            .collect();
        let mut key = 0u32;
        while used.contains(&key) {
            key += 1;
        }
        edge.key = key;
        self.graph.add_edge(u, v, edge);
        key
    }

    /// Inserts an edge keeping the key already stamped on it. Used when
    /// copying edges between graphs; the caller guarantees uniqueness.
    pub(crate) fn add_edge_preserving_key(
        &mut self,
        u: NodeIndex,
        v: NodeIndex,
        edge: StreetEdge,
    ) -> EdgeIndex {
        self.graph.add_edge(u, v, edge)
    }

    pub fn edge(&self, idx: EdgeIndex) -> &StreetEdge {
        &self.graph[idx]
    }

    pub fn edge_mut(&mut self, idx: EdgeIndex) -> &mut StreetEdge {
        &mut self.graph[idx]
    }

    pub fn edge_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(idx)
    }

    /// All parallel edges from `u` to `v`, ordered by key.
    pub fn edges_between(&self, u: NodeIndex, v: NodeIndex) -> Vec<(EdgeIndex, &StreetEdge)> {
        let mut edges: Vec<(EdgeIndex, &StreetEdge)> = self
            .graph
            .edges_connecting(u, v)
            .map(|e| (e.id(), e.weight()))
            .collect();
        edges.sort_by_key(|(_, e)| e.key);
        edges
    }

    /// Looks up one edge by its `(u, v, key)` triple.
    pub fn edge_by_key(&self, u: NodeIndex, v: NodeIndex, key: u32) -> Option<EdgeIndex> {
        self.graph
            .edges_connecting(u, v)
            .find(|e| e.weight().key == key)
            .map(|e| e.id())
    }

    /// Out-degree counting parallel edges.
    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Outgoing).count()
    }

    /// In-degree counting parallel edges.
    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Total degree counting parallel edges; a self-loop contributes to both
    /// the in- and out-count.
    pub fn degree(&self, idx: NodeIndex) -> usize {
        self.out_degree(idx) + self.in_degree(idx)
    }

    /// Distinct out-neighbors in first-seen order.
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Distinct in-neighbors in first-seen order.
    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Distinct neighbors in either direction, excluding the node itself.
    pub fn distinct_neighbors(&self, idx: NodeIndex) -> HashSet<NodeIndex> {
        self.graph
            .neighbors_undirected(idx)
            .filter(|&n| n != idx)
            .collect()
    }

    pub fn has_self_loop(&self, idx: NodeIndex) -> bool {
        self.graph.edges_connecting(idx, idx).next().is_some()
    }

    /// Fresh graph induced by the given node set: those nodes plus every
    /// edge whose endpoints both survive, attributes cloned and parallel
    /// keys preserved.
    pub fn subgraph(&self, keep: &HashSet<NodeIndex>) -> StreetGraph {
        let mut out = StreetGraph {
            graph: StableDiGraph::default(),
            node_ids: HashMap::new(),
            meta: self.meta.clone(),
        };
        let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(keep.len());
        for idx in self.graph.node_indices() {
            if keep.contains(&idx) {
                remap.insert(idx, out.add_node(self.graph[idx].clone()));
            }
        }
        for edge in self.graph.edge_references() {
            if let (Some(&u), Some(&v)) = (remap.get(&edge.source()), remap.get(&edge.target())) {
                out.add_edge_preserving_key(u, v, edge.weight().clone());
            }
        }
        out
    }

    /// Empty graph carrying over this graph's metadata.
    pub fn empty_like(&self) -> StreetGraph {
        StreetGraph {
            graph: StableDiGraph::default(),
            node_ids: HashMap::new(),
            meta: self.meta.clone(),
        }
    }

    /// Drops the listed nodes (with incident edges) in one pass.
    pub fn remove_nodes(&mut self, to_remove: &[NodeIndex]) {
        for &idx in to_remove {
            self.remove_node(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StreetEdge, StreetNode};

    fn empty_graph() -> StreetGraph {
        StreetGraph::new(Crs::wgs84())
    }

    #[test]
    fn parallel_edges_get_fresh_keys() {
        let mut g = empty_graph();
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 1.0, 0.0));

        assert_eq!(g.add_edge(a, b, StreetEdge::new(10, false)), 0);
        assert_eq!(g.add_edge(a, b, StreetEdge::new(11, false)), 1);
        assert_eq!(g.add_edge(b, a, StreetEdge::new(10, false)), 0);

        let parallels = g.edges_between(a, b);
        assert_eq!(parallels.len(), 2);
        assert_eq!(parallels[0].1.key, 0);
        assert_eq!(parallels[1].1.key, 1);
    }

    #[test]
    fn degrees_count_parallels() {
        let mut g = empty_graph();
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 1.0, 0.0));
        g.add_edge(a, b, StreetEdge::new(10, false));
        g.add_edge(a, b, StreetEdge::new(11, false));
        g.add_edge(b, a, StreetEdge::new(12, false));

        assert_eq!(g.out_degree(a), 2);
        assert_eq!(g.in_degree(a), 1);
        assert_eq!(g.degree(a), 3);
        assert_eq!(g.distinct_neighbors(a).len(), 1);
    }

    #[test]
    fn removing_a_node_drops_incident_edges_and_id() {
        let mut g = empty_graph();
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 1.0, 0.0));
        g.add_edge(a, b, StreetEdge::new(10, false));

        g.remove_node(b);
        assert_eq!(g.edge_count(), 0);
        assert!(g.node_index(2).is_none());
        assert!(g.node_index(1).is_some());
    }

    #[test]
    fn re_adding_a_node_replaces_attributes() {
        let mut g = empty_graph();
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let mut replacement = StreetNode::new(1, 5.0, 5.0);
        replacement.street_count = Some(3);
        let a2 = g.add_node(replacement);

        assert_eq!(a, a2);
        assert_eq!(g.node(a).x, 5.0);
        assert_eq!(g.node(a).street_count, Some(3));
    }

    #[test]
    fn subgraph_preserves_keys_and_meta() {
        let mut g = empty_graph();
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 1.0, 0.0));
        let c = g.add_node(StreetNode::new(3, 2.0, 0.0));
        g.add_edge(a, b, StreetEdge::new(10, false));
        g.add_edge(a, b, StreetEdge::new(11, false));
        g.add_edge(b, c, StreetEdge::new(12, false));

        let keep: HashSet<NodeIndex> = [a, b].into_iter().collect();
        let sub = g.subgraph(&keep);

        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 2);
        let u = sub.node_index(1).unwrap();
        let v = sub.node_index(2).unwrap();
        let keys: Vec<u32> = sub.edges_between(u, v).iter().map(|(_, e)| e.key).collect();
        assert_eq!(keys, vec![0, 1]);
        assert_eq!(sub.meta.crs, g.meta.crs);
    }
}
