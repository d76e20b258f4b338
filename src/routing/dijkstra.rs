//! Dijkstra's algorithm over the street multigraph. Parallel edges between
//! the same pair collapse to the minimum weight by relaxation.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::{HashMap, HashSet};
use log::warn;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use rayon::prelude::*;

use crate::Error;
use crate::model::{OsmId, StreetGraph};
use crate::routing::Weight;

#[derive(Copy, Clone)]
struct State {
    cost: f64,
    node: NodeIndex,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for State {}

// Min-heap by cost (reversed from standard Rust BinaryHeap); node index
// breaks cost ties deterministically.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.index().cmp(&self.node.index()))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search constraints used by the k-shortest spur searches.
#[derive(Default)]
pub(crate) struct Restrictions {
    pub banned_nodes: HashSet<NodeIndex>,
    pub banned_edges: HashSet<(NodeIndex, NodeIndex)>,
}

pub(crate) struct ShortestPathTree {
    pub distances: HashMap<NodeIndex, f64>,
    predecessors: HashMap<NodeIndex, NodeIndex>,
    source: NodeIndex,
    /// Edges disqualified by a missing or non-finite weight.
    pub skipped_edges: usize,
}

impl ShortestPathTree {
    pub fn cost_to(&self, target: NodeIndex) -> Option<f64> {
        self.distances.get(&target).copied()
    }

    /// Node sequence from the source to `target`, if reached.
    pub fn path_to(&self, target: NodeIndex) -> Option<Vec<NodeIndex>> {
        if target != self.source && !self.predecessors.contains_key(&target) {
            return None;
        }
        let mut path = vec![target];
        let mut current = target;
        while current != self.source {
            current = *self.predecessors.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}

/// Single-source Dijkstra. Stops early once `target` is settled; `max_cost`
/// bounds the expansion frontier for distance truncation.
pub(crate) fn dijkstra(
    graph: &StreetGraph,
    source: NodeIndex,
    target: Option<NodeIndex>,
    weight: &Weight,
    max_cost: Option<f64>,
    restrictions: Option<&Restrictions>,
) -> ShortestPathTree {
    let mut tree = ShortestPathTree {
        distances: HashMap::new(),
        predecessors: HashMap::new(),
        source,
        skipped_edges: 0,
    };
    let mut heap = BinaryHeap::new();

    heap.push(State {
        cost: 0.0,
        node: source,
    });
    tree.distances.insert(source, 0.0);

    while let Some(State { cost, node }) = heap.pop() {
        if target == Some(node) {
            break;
        }
        if let Some(&best) = tree.distances.get(&node) {
            if cost > best {
                continue;
            }
        }
        if let Some(max) = max_cost {
            if cost > max {
                continue;
            }
        }

        for edge in graph.graph.edges_directed(node, Direction::Outgoing) {
            let next = edge.target();
            if let Some(r) = restrictions {
                if r.banned_nodes.contains(&next) || r.banned_edges.contains(&(node, next)) {
                    continue;
                }
            }
            let Some(edge_weight) = weight.of(edge.weight()) else {
                tree.skipped_edges += 1;
                continue;
            };
            let next_cost = cost + edge_weight;

            match tree.distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                    tree.predecessors.insert(next, node);
                    heap.push(State {
                        cost: next_cost,
                        node: next,
                    });
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                        tree.predecessors.insert(next, node);
                        heap.push(State {
                            cost: next_cost,
                            node: next,
                        });
                    }
                }
            }
        }
    }

    tree
}

pub(crate) fn resolve(graph: &StreetGraph, id: OsmId) -> Result<NodeIndex, Error> {
    graph
        .node_index(id)
        .ok_or_else(|| Error::InvalidInput(format!("node {id} is not in the graph")))
}

/// Weighted shortest path as a node-id sequence `[orig, ..., dest]`.
///
/// # Errors
///
/// [`Error::NoPath`] when no directed path exists, [`Error::InvalidInput`]
/// when either endpoint is not in the graph.
pub fn shortest_path(
    graph: &StreetGraph,
    orig: OsmId,
    dest: OsmId,
    weight: &Weight,
) -> Result<Vec<OsmId>, Error> {
    let source = resolve(graph, orig)?;
    let target = resolve(graph, dest)?;

    let tree = dijkstra(graph, source, Some(target), weight, None, None);
    if tree.skipped_edges > 0 {
        warn!(
            "skipped {} edges with missing or non-finite weight",
            tree.skipped_edges
        );
    }
    match tree.path_to(target) {
        Some(path) => Ok(path.into_iter().map(|n| graph.node_id(n)).collect()),
        None => Err(Error::NoPath {
            origin: orig,
            destination: dest,
        }),
    }
}

/// Vectorized shortest paths over same-length origin/destination slices.
/// Unreachable pairs yield `None`.
///
/// # Errors
///
/// [`Error::InvalidInput`] when the slices differ in length or name unknown
/// nodes.
pub fn shortest_paths(
    graph: &StreetGraph,
    origs: &[OsmId],
    dests: &[OsmId],
    weight: &Weight,
) -> Result<Vec<Option<Vec<OsmId>>>, Error> {
    if origs.len() != dests.len() {
        return Err(Error::InvalidInput(format!(
            "origins and destinations differ in length ({} vs {})",
            origs.len(),
            dests.len()
        )));
    }
    origs
        .par_iter()
        .zip(dests.par_iter())
        .map(|(&o, &d)| match shortest_path(graph, o, d, weight) {
            Ok(path) => Ok(Some(path)),
            Err(Error::NoPath { .. }) => Ok(None),
            Err(e) => Err(e),
        })
        .collect()
}
