//! Intersection consolidation: merges junction nodes whose buffered
//! neighborhoods overlap into single representative nodes.

use geo::Point;
use hashbrown::HashMap;
use log::info;
use petgraph::graph::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, NodeIndexable};
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::Error;
use crate::algo::stats;
use crate::geometry::Crs;
use crate::model::StreetGraph;

type IndexedPoint = GeomWithData<Point<f64>, NodeIndex>;

// Meters per degree of latitude, and of longitude at the equator. Used only
// to over-approximate a search radius for the r-tree cull; the exact test
// runs the CRS distance.
const M_PER_DEG_LAT: f64 = 110_574.0;
const M_PER_DEG_LON_EQ: f64 = 111_320.0;

/// Merges all nodes within `2 * tolerance` meters of each other (buffers of
/// radius `tolerance` overlap) into single nodes, and returns a fresh graph
/// with every edge relabelled to the cluster representatives.
///
/// The representative is the cluster's smallest node id; its coordinates are
/// the arithmetic mean of the cluster, and the merged ids are recorded on it.
/// Nodes without finite coordinates survive as singleton clusters.
///
/// # Errors
///
/// [`Error::InvalidInput`] when the tolerance is not a positive finite
/// number of meters.
pub fn consolidate_intersections(
    graph: &StreetGraph,
    tolerance: f64,
) -> Result<StreetGraph, Error> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "consolidation tolerance must be positive meters, got {tolerance}"
        )));
    }

    let threshold = 2.0 * tolerance;
    let crs = graph.meta.crs.clone();

    let located: Vec<IndexedPoint> = graph
        .node_indices()
        .filter(|&n| graph.node(n).has_coords())
        .map(|n| GeomWithData::new(graph.node(n).point(), n))
        .collect();
    let tree = RTree::bulk_load(located.clone());

    let mut clusters = UnionFind::<usize>::new(graph.graph.node_bound());
    for entry in &located {
        let point = *entry.geom();
        let radius = cull_radius(&crs, point.y(), threshold);
        for candidate in tree.locate_within_distance(point, radius * radius) {
            if candidate.data != entry.data
                && crs.distance(point, *candidate.geom()) <= threshold
            {
                clusters.union(entry.data.index(), candidate.data.index());
            }
        }
    }

    // Group members per cluster root in ascending node-index order so both
    // representatives and edge relabelling are deterministic.
    let mut members: Vec<(usize, Vec<NodeIndex>)> = Vec::new();
    let mut root_pos: HashMap<usize, usize> = HashMap::new();
    for idx in graph.node_indices() {
        let root = clusters.find(idx.index());
        match root_pos.get(&root) {
            Some(&pos) => members[pos].1.push(idx),
            None => {
                root_pos.insert(root, members.len());
                members.push((root, vec![idx]));
            }
        }
    }

    let mut out = graph.empty_like();
    let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(graph.node_count());
    let mut merged_clusters = 0usize;

    for (_, cluster) in &members {
        let rep_id = cluster
            .iter()
            .map(|&n| graph.node_id(n))
            .min()
            .unwrap_or_default();
        let rep_old = cluster
            .iter()
            .find(|&&n| graph.node_id(n) == rep_id)
            .copied()
            .unwrap_or(cluster[0]);

        let mut node = graph.node(rep_old).clone();
        if cluster.len() > 1 {
            merged_clusters += 1;
            let with_coords: Vec<Point<f64>> = cluster
                .iter()
                .map(|&n| graph.node(n))
                .filter(|n| n.has_coords())
                .map(|n| n.point())
                .collect();
            if !with_coords.is_empty() {
                let count = with_coords.len() as f64;
                node.x = with_coords.iter().map(|p| p.x()).sum::<f64>() / count;
                node.y = with_coords.iter().map(|p| p.y()).sum::<f64>() / count;
            }
            let mut ids: Vec<i64> = cluster.iter().map(|&n| graph.node_id(n)).collect();
            ids.sort_unstable();
            node.merged_nodes = Some(ids);
        }

        let new_idx = out.add_node(node);
        for &member in cluster {
            remap.insert(member, new_idx);
        }
    }

    for edge in graph.graph.edge_references() {
        if let (Some(&u), Some(&v)) = (remap.get(&edge.source()), remap.get(&edge.target())) {
            out.add_edge(u, v, edge.weight().clone());
        }
    }

    stats::stamp_street_counts(&mut out);
    info!(
        "consolidated {} nodes into {} ({merged_clusters} merged clusters)",
        graph.node_count(),
        out.node_count()
    );
    Ok(out)
}

/// Search radius, in CRS units, guaranteed to cover every point within
/// `threshold` meters of a point at the given latitude.
fn cull_radius(crs: &Crs, lat: f64, threshold: f64) -> f64 {
    match crs {
        Crs::Projected { .. } => threshold,
        Crs::Geographic { .. } => {
            let cos_lat = lat.to_radians().cos().abs().max(1e-6);
            let deg_lat = threshold / M_PER_DEG_LAT;
            let deg_lon = threshold / (M_PER_DEG_LON_EQ * cos_lat);
            deg_lat.max(deg_lon) * 1.05
        }
    }
}
