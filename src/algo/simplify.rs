//! Topological simplification: collapses chains of interstitial nodes into
//! single edges with merged attributes and synthesized geometries.

use geo::{Coord, LineString};
use hashbrown::{HashMap, HashSet};
use log::info;
use petgraph::graph::NodeIndex;

use crate::Error;
use crate::algo::stats;
use crate::model::{AttrValue, StreetEdge, StreetGraph};

/// Step cap for a single chain walk, guarding against malformed inputs.
const MAX_TRACE_STEPS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct SimplifyOptions {
    /// Record the original `(u, v)` constituent pairs on each merged edge.
    pub track_merged: bool,
    /// Drop isolated self-looped nodes left over after collapsing.
    pub remove_rings: bool,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self {
            track_merged: false,
            remove_rings: true,
        }
    }
}

/// Whether a node survives simplification.
///
/// Endpoints are nodes with a self-loop, nodes missing one direction
/// entirely, and nodes whose local degree pattern is not that of a chain:
/// a node is interstitial only with exactly two distinct neighbors and a
/// total degree of 2 (oneway chain) or 4 (two reciprocal pairs).
pub fn is_endpoint(graph: &StreetGraph, node: NodeIndex) -> bool {
    if graph.has_self_loop(node) {
        return true;
    }
    if graph.in_degree(node) == 0 || graph.out_degree(node) == 0 {
        return true;
    }
    let neighbors = graph.distinct_neighbors(node).len();
    let degree = graph.degree(node);
    !(neighbors == 2 && (degree == 2 || degree == 4))
}

/// Walks from `endpoint` through interstitial `start` until another endpoint
/// is reached, returning the ordered node path.
///
/// A branching encountered at a non-endpoint terminates the walk with the
/// path traced so far.
fn build_path(
    graph: &StreetGraph,
    endpoint: NodeIndex,
    start: NodeIndex,
    endpoints: &HashSet<NodeIndex>,
) -> Result<Vec<NodeIndex>, Error> {
    let mut path = vec![endpoint, start];
    let mut node = start;
    let mut steps = 0usize;

    while !endpoints.contains(&node) {
        steps += 1;
        if steps > MAX_TRACE_STEPS {
            return Err(Error::GraphTooComplex);
        }

        let successors: Vec<NodeIndex> = graph
            .successors(node)
            .into_iter()
            .filter(|s| !path.contains(s))
            .collect();

        match successors.as_slice() {
            [next] => {
                node = *next;
                path.push(node);
            }
            [] => {
                // Chain loops back onto its starting endpoint, or the input
                // is malformed; either way the walk is over.
                if graph.successors(node).contains(&endpoint) {
                    path.push(endpoint);
                }
                return Ok(path);
            }
            _ => return Ok(path),
        }
    }
    Ok(path)
}

fn paths_to_simplify(
    graph: &StreetGraph,
    endpoints: &HashSet<NodeIndex>,
) -> Result<Vec<Vec<NodeIndex>>, Error> {
    let mut paths = Vec::new();
    for endpoint in graph.node_indices() {
        if !endpoints.contains(&endpoint) {
            continue;
        }
        for successor in graph.successors(endpoint) {
            if !endpoints.contains(&successor) {
                paths.push(build_path(graph, endpoint, successor, endpoints)?);
            }
        }
    }
    Ok(paths)
}

struct MergedEdge {
    u: NodeIndex,
    v: NodeIndex,
    edge: StreetEdge,
}

/// Merges the constituent edges along `path` into a single replacement edge.
/// Ties among parallel edges go to the smallest insertion key.
fn merge_path(graph: &StreetGraph, path: &[NodeIndex], track_merged: bool) -> Option<MergedEdge> {
    let mut length = 0.0;
    let mut osmid: Vec<i64> = Vec::new();
    let mut oneway = true;
    let mut reversed = true;
    let mut tag_values: Vec<(String, Vec<AttrValue>)> = Vec::new();
    let mut merged_pairs: Vec<(i64, i64)> = Vec::new();

    for pair in path.windows(2) {
        let parallels = graph.edges_between(pair[0], pair[1]);
        let (_, edge) = parallels.first()?;

        if edge.length.is_finite() {
            length += edge.length;
        }
        for id in &edge.osmid {
            if !osmid.contains(id) {
                osmid.push(*id);
            }
        }
        oneway &= edge.oneway;
        reversed &= edge.reversed;

        for (key, value) in &edge.tags {
            match tag_values.iter_mut().find(|(k, _)| k == key) {
                Some((_, values)) => values.push(value.clone()),
                None => tag_values.push((key.clone(), vec![value.clone()])),
            }
        }
        if track_merged {
            merged_pairs.push((graph.node_id(pair[0]), graph.node_id(pair[1])));
        }
    }

    let geometry = LineString::new(
        path.iter()
            .map(|&n| {
                let node = graph.node(n);
                Coord {
                    x: node.x,
                    y: node.y,
                }
            })
            .collect(),
    );

    let mut edge = StreetEdge {
        osmid,
        key: 0,
        length,
        oneway,
        reversed,
        geometry: Some(geometry),
        speed_kph: None,
        travel_time: None,
        grade: None,
        bearing: None,
        merged_edges: track_merged.then_some(merged_pairs),
        tags: HashMap::new(),
    };
    for (key, values) in tag_values {
        if let Some(merged) = AttrValue::merged(values) {
            edge.tags.insert(key, merged);
        }
    }

    Some(MergedEdge {
        u: path[0],
        v: path[path.len() - 1],
        edge,
    })
}

/// Collapses every interstitial chain, removes the interior nodes, inserts
/// the merged edges, and flags the graph simplified.
///
/// # Errors
///
/// [`Error::AlreadySimplified`] on a second invocation,
/// [`Error::GraphTooComplex`] when a chain walk exceeds the step cap.
pub fn simplify_graph(graph: &mut StreetGraph, options: &SimplifyOptions) -> Result<(), Error> {
    if graph.meta.simplified {
        return Err(Error::AlreadySimplified);
    }

    let endpoints: HashSet<NodeIndex> = graph
        .node_indices()
        .filter(|&n| is_endpoint(graph, n))
        .collect();
    let paths = paths_to_simplify(graph, &endpoints)?;

    let mut merged: Vec<MergedEdge> = Vec::with_capacity(paths.len());
    let mut interior: Vec<NodeIndex> = Vec::new();
    let mut interior_seen: HashSet<NodeIndex> = HashSet::new();
    for path in &paths {
        if let Some(edge) = merge_path(graph, path, options.track_merged) {
            merged.push(edge);
        }
        for &node in &path[1..path.len() - 1] {
            if interior_seen.insert(node) {
                interior.push(node);
            }
        }
    }

    let collapsed = interior.len();
    graph.remove_nodes(&interior);
    for merged_edge in merged {
        graph.add_edge(merged_edge.u, merged_edge.v, merged_edge.edge);
    }

    if options.remove_rings {
        let rings: Vec<NodeIndex> = graph
            .node_indices()
            .filter(|&n| graph.has_self_loop(n) && graph.distinct_neighbors(n).is_empty())
            .collect();
        for ring in rings {
            graph.remove_node(ring);
        }
    }

    graph.meta.simplified = true;
    stats::stamp_street_counts(graph);
    info!(
        "simplified graph: collapsed {collapsed} interstitial nodes, {} nodes remain",
        graph.node_count()
    );
    Ok(())
}
