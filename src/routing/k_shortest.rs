//! Yen's algorithm for the k shortest loopless paths.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use hashbrown::HashSet;
use petgraph::graph::NodeIndex;

use crate::Error;
use crate::model::{OsmId, StreetGraph};
use crate::routing::Weight;
use crate::routing::dijkstra::{Restrictions, dijkstra, resolve};

/// Candidate deviation path. The heap is a min-heap on cost; exact node
/// sequences break ties so iteration order never depends on hashing.
struct Candidate {
    cost: f64,
    path: Vec<NodeIndex>,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.path == other.path
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.path.cmp(&self.path))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total cost of a node sequence, collapsing parallel edges to the minimum
/// weight per hop. `None` when some hop has no usable edge.
fn path_cost(graph: &StreetGraph, path: &[NodeIndex], weight: &Weight) -> Option<f64> {
    let mut total = 0.0;
    for pair in path.windows(2) {
        let hop = graph
            .edges_between(pair[0], pair[1])
            .iter()
            .filter_map(|(_, e)| weight.of(e))
            .min_by(|a, b| a.total_cmp(b))?;
        total += hop;
    }
    Some(total)
}

/// Up to `k` loopless paths from `orig` to `dest`, sorted by total weight
/// non-decreasing and pairwise distinct. Empty when no path exists at all.
///
/// # Errors
///
/// [`Error::InvalidInput`] when either endpoint is not in the graph.
pub fn k_shortest_paths(
    graph: &StreetGraph,
    orig: OsmId,
    dest: OsmId,
    k: usize,
    weight: &Weight,
) -> Result<Vec<Vec<OsmId>>, Error> {
    let source = resolve(graph, orig)?;
    let target = resolve(graph, dest)?;
    if k == 0 {
        return Ok(Vec::new());
    }

    let seed_tree = dijkstra(graph, source, Some(target), weight, None, None);
    let Some(seed) = seed_tree.path_to(target) else {
        return Ok(Vec::new());
    };
    let seed_cost = path_cost(graph, &seed, weight).unwrap_or(0.0);

    // Shortest paths found so far, in final output order.
    let mut found: Vec<(f64, Vec<NodeIndex>)> = vec![(seed_cost, seed)];
    // Candidate deviations, deduplicated by exact node sequence.
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut seen: HashSet<Vec<NodeIndex>> = HashSet::new();
    seen.insert(found[0].1.clone());

    while found.len() < k {
        let previous = found[found.len() - 1].1.clone();

        for spur_idx in 0..previous.len() - 1 {
            let spur = previous[spur_idx];
            let root = &previous[..=spur_idx];

            let mut restrictions = Restrictions::default();
            // Forbid continuing the shared root the way any found path does.
            for (_, path) in &found {
                if path.len() > spur_idx + 1 && path[..=spur_idx] == *root {
                    restrictions
                        .banned_edges
                        .insert((path[spur_idx], path[spur_idx + 1]));
                }
            }
            // Forbid the root itself (except the spur node) to keep the
            // combined path loopless.
            restrictions.banned_nodes.extend(&root[..spur_idx]);

            let spur_tree = dijkstra(
                graph,
                spur,
                Some(target),
                weight,
                None,
                Some(&restrictions),
            );
            if let Some(spur_path) = spur_tree.path_to(target) {
                let mut total: Vec<NodeIndex> = root[..spur_idx].to_vec();
                total.extend(spur_path);
                if seen.insert(total.clone()) {
                    if let Some(cost) = path_cost(graph, &total, weight) {
                        candidates.push(Candidate { cost, path: total });
                    }
                }
            }
        }

        match candidates.pop() {
            Some(best) => found.push((best.cost, best.path)),
            None => break,
        }
    }

    Ok(found
        .into_iter()
        .map(|(_, path)| path.into_iter().map(|n| graph.node_id(n)).collect())
        .collect())
}
