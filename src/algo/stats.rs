//! Morphometric statistics over the street graph.

use hashbrown::{HashMap, HashSet};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use crate::Error;
use crate::geometry;
use crate::model::StreetGraph;

/// Physical streets incident to each node.
///
/// A street and its reciprocal twin share endpoints and key, so counting
/// distinct `(min, max, key)` triples folds the two directions of a two-way
/// street into one while keeping genuinely parallel streets apart. A
/// self-loop contributes 2.
pub fn count_streets_per_node(graph: &StreetGraph) -> HashMap<NodeIndex, u32> {
    let mut counts = HashMap::with_capacity(graph.node_count());
    for node in graph.node_indices() {
        let mut streets: HashSet<(usize, usize, u32)> = HashSet::new();
        let mut loops: HashSet<u32> = HashSet::new();

        let incident = graph
            .graph
            .edges_directed(node, Direction::Outgoing)
            .chain(graph.graph.edges_directed(node, Direction::Incoming));
        for edge in incident {
            let (s, t) = (edge.source().index(), edge.target().index());
            if s == t {
                loops.insert(edge.weight().key);
            } else {
                streets.insert((s.min(t), s.max(t), edge.weight().key));
            }
        }
        counts.insert(node, (streets.len() + 2 * loops.len()) as u32);
    }
    counts
}

/// Recomputes and stores `street_count` on every node.
pub fn stamp_street_counts(graph: &mut StreetGraph) {
    let counts = count_streets_per_node(graph);
    for (node, count) in counts {
        graph.node_mut(node).street_count = Some(count);
    }
}

/// Sum of all finite edge lengths, in meters.
pub fn edge_length_total(graph: &StreetGraph) -> f64 {
    graph
        .graph
        .edge_references()
        .map(|e| e.weight().length)
        .filter(|l| l.is_finite())
        .sum()
}

/// Sum of street lengths, counting each reciprocal directed pair once.
pub fn street_length_total(graph: &StreetGraph) -> f64 {
    let mut seen: HashSet<(usize, usize, u32)> = HashSet::new();
    let mut total = 0.0;
    for edge in graph.graph.edge_references() {
        let (s, t) = (edge.source().index(), edge.target().index());
        if seen.insert((s.min(t), s.max(t), edge.weight().key)) && edge.weight().length.is_finite()
        {
            total += edge.weight().length;
        }
    }
    total
}

/// Number of unique unordered `(u, v)` endpoint pairs.
pub fn street_segment_count(graph: &StreetGraph) -> usize {
    let pairs: HashSet<(usize, usize)> = graph
        .graph
        .edge_references()
        .map(|e| {
            let (s, t) = (e.source().index(), e.target().index());
            (s.min(t), s.max(t))
        })
        .collect();
    pairs.len()
}

/// Nodes where at least `min_streets` physical streets meet.
pub fn intersection_count(graph: &StreetGraph, min_streets: u32) -> usize {
    count_streets_per_node(graph)
        .values()
        .filter(|&&count| count >= min_streets)
        .count()
}

/// Share of edges that are self-loops; `None` for an edgeless graph.
pub fn self_loop_proportion(graph: &StreetGraph) -> Option<f64> {
    let total = graph.edge_count();
    if total == 0 {
        return None;
    }
    let loops = graph
        .graph
        .edge_references()
        .filter(|e| e.source() == e.target())
        .count();
    Some(loops as f64 / total as f64)
}

/// Mean ratio of edge length to straight-line endpoint distance. Segments
/// with zero straight-line distance or a non-finite length are skipped;
/// `None` when nothing remains.
pub fn circuity_avg(graph: &StreetGraph) -> Option<f64> {
    let crs = &graph.meta.crs;
    let mut sum = 0.0;
    let mut count = 0usize;
    for edge in graph.graph.edge_references() {
        let length = edge.weight().length;
        if !length.is_finite() {
            continue;
        }
        let u = graph.node(edge.source());
        let v = graph.node(edge.target());
        if !(u.has_coords() && v.has_coords()) {
            continue;
        }
        let straight = crs.distance(u.point(), v.point());
        if straight > 0.0 {
            sum += length / straight;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Stamps the straight endpoint-to-endpoint compass bearing on every edge.
///
/// # Errors
///
/// [`Error::InvalidInput`] on a projected graph: bearings are only defined
/// over lat/lon coordinates.
pub fn add_edge_bearings(graph: &mut StreetGraph) -> Result<(), Error> {
    if graph.meta.crs.is_projected() {
        return Err(Error::InvalidInput(
            "bearings require an unprojected lat/lon graph".to_string(),
        ));
    }
    let edge_indices: Vec<_> = graph.graph.edge_indices().collect();
    for idx in edge_indices {
        if let Some((u, v)) = graph.edge_endpoints(idx) {
            let from = graph.node(u).point();
            let to = graph.node(v).point();
            let bearing = geometry::bearing(from.y(), from.x(), to.y(), to.x());
            graph.edge_mut(idx).bearing = Some(bearing);
        }
    }
    Ok(())
}

/// Shannon entropy (natural log) of the bearing distribution over `bins`
/// orientation bins. The histogram is built at double resolution, rolled by
/// one, and re-merged so bin edges do not sit exactly on the cardinal
/// directions. `None` for empty input.
pub fn orientation_entropy(bearings: &[f64], bins: usize) -> Option<f64> {
    if bearings.is_empty() || bins == 0 {
        return None;
    }
    let doubled = bins * 2;
    let width = 360.0 / doubled as f64;
    let mut hist = vec![0usize; doubled];
    for &b in bearings {
        let idx = (b.rem_euclid(360.0) / width).floor() as usize % doubled;
        hist[idx] += 1;
    }
    hist.rotate_right(1);

    let merged: Vec<usize> = (0..bins).map(|i| hist[2 * i] + hist[2 * i + 1]).collect();
    let total: usize = merged.iter().sum();
    if total == 0 {
        return None;
    }
    let entropy = merged
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    Some(entropy)
}

/// One-call summary of the most used aggregates.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BasicStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub edge_length_total: f64,
    pub street_length_total: f64,
    pub street_segment_count: usize,
    pub intersection_count: usize,
    pub self_loop_proportion: Option<f64>,
    pub circuity_avg: Option<f64>,
}

pub fn basic_stats(graph: &StreetGraph) -> BasicStats {
    BasicStats {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        edge_length_total: edge_length_total(graph),
        street_length_total: street_length_total(graph),
        street_segment_count: street_segment_count(graph),
        intersection_count: intersection_count(graph, 2),
        self_loop_proportion: self_loop_proportion(graph),
        circuity_avg: circuity_avg(graph),
    }
}
