//! Spatial acceleration structures: nearest-node and nearest-edge queries
//! plus the quadrat polygon partitioner.

pub mod quadrat;

use geo::{Coord, Point};
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use rayon::prelude::*;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use crate::geometry::Crs;
use crate::model::{OsmId, StreetGraph};

pub type IndexedPoint = GeomWithData<Point<f64>, NodeIndex>;

/// Planar-filter candidate cap for the geodesic refinement pass.
const REFINE_CANDIDATES: usize = 64;

/// Static nearest-node index over every node with finite coordinates.
///
/// For a geographic CRS the r-tree ranks candidates in planar degree space
/// and the query refines the short candidate list with the great-circle
/// distance; for a projected CRS the planar ranking is already exact.
pub struct NodeLocator {
    tree: RTree<IndexedPoint>,
}

impl NodeLocator {
    pub fn new(graph: &StreetGraph) -> Self {
        let entries: Vec<IndexedPoint> = graph
            .node_indices()
            .filter(|&n| graph.node(n).has_coords())
            .map(|n| GeomWithData::new(graph.node(n).point(), n))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Id of the nearest node and its distance in meters. Ties go to the
    /// smaller node id.
    pub fn nearest_node(&self, graph: &StreetGraph, point: Point<f64>) -> Option<(OsmId, f64)> {
        match graph.meta.crs {
            Crs::Projected { .. } => self.tree.nearest_neighbor(&point).map(|entry| {
                (
                    graph.node_id(entry.data),
                    graph.meta.crs.distance(point, *entry.geom()),
                )
            }),
            Crs::Geographic { .. } => {
                let mut candidates = self.tree.nearest_neighbor_iter(&point);
                let first = candidates.next()?;
                let first_planar = planar_distance(point, *first.geom());
                let mut best = (
                    graph.node_id(first.data),
                    graph.meta.crs.distance(point, *first.geom()),
                );

                // Candidates beyond twice the best planar distance cannot win
                // the geodesic comparison in practice; the cap bounds work on
                // degenerate inputs.
                for entry in candidates.take(REFINE_CANDIDATES) {
                    let planar = planar_distance(point, *entry.geom());
                    if planar > first_planar * 2.0 + f64::EPSILON {
                        break;
                    }
                    let dist = graph.meta.crs.distance(point, *entry.geom());
                    let id = graph.node_id(entry.data);
                    if dist < best.1 || (dist == best.1 && id < best.0) {
                        best = (id, dist);
                    }
                }
                Some(best)
            }
        }
    }

    /// Bulk variant of [`Self::nearest_node`].
    pub fn nearest_nodes(
        &self,
        graph: &StreetGraph,
        points: &[Point<f64>],
    ) -> Vec<Option<(OsmId, f64)>> {
        points
            .par_iter()
            .map(|&p| self.nearest_node(graph, p))
            .collect()
    }
}

fn planar_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

/// Nearest edge to a point, as its `(u, v, key)` triple plus the distance in
/// meters. Brute force over all edges with a bounding-box cull; ties keep
/// the first edge seen in iteration order.
///
/// Edges without stored geometry are measured against the straight segment
/// between their endpoint coordinates.
pub fn nearest_edge(
    graph: &StreetGraph,
    point: Point<f64>,
) -> Option<(OsmId, OsmId, u32, f64)> {
    let scale = MetricScale::for_point(&graph.meta.crs, point);
    let mut best: Option<(OsmId, OsmId, u32, f64)> = None;

    for edge in graph.graph.edge_references() {
        let u = graph.node(edge.source());
        let v = graph.node(edge.target());
        if !(u.has_coords() && v.has_coords()) {
            continue;
        }

        let line;
        let coords: &[Coord<f64>] = match &edge.weight().geometry {
            Some(geometry) => &geometry.0,
            None => {
                line = crate::geometry::straight_line(u.x, u.y, v.x, v.y);
                &line.0
            }
        };

        if let Some((_, _, _, best_dist)) = best {
            if bbox_lower_bound(coords, point, &scale) >= best_dist {
                continue;
            }
        }

        let dist = point_line_distance(coords, point, &scale);
        let better = match best {
            Some((_, _, _, best_dist)) => dist < best_dist,
            None => true,
        };
        if better {
            best = Some((u.id, v.id, edge.weight().key, dist));
        }
    }
    best
}

/// Bulk variant of [`nearest_edge`].
pub fn nearest_edges(
    graph: &StreetGraph,
    points: &[Point<f64>],
) -> Vec<Option<(OsmId, OsmId, u32, f64)>> {
    points
        .par_iter()
        .map(|&p| nearest_edge(graph, p))
        .collect()
}

/// Local equirectangular meter scale around the query point, collapsing to
/// the identity for projected coordinates.
struct MetricScale {
    kx: f64,
    ky: f64,
}

impl MetricScale {
    fn for_point(crs: &Crs, point: Point<f64>) -> Self {
        match crs {
            Crs::Projected { .. } => Self { kx: 1.0, ky: 1.0 },
            Crs::Geographic { .. } => Self {
                kx: 111_320.0 * point.y().to_radians().cos().abs().max(1e-6),
                ky: 110_574.0,
            },
        }
    }

    fn meters(&self, from: Point<f64>, to: Coord<f64>) -> (f64, f64) {
        ((to.x - from.x()) * self.kx, (to.y - from.y()) * self.ky)
    }
}

fn bbox_lower_bound(coords: &[Coord<f64>], point: Point<f64>, scale: &MetricScale) -> f64 {
    let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
    let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in coords {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    let clamped = Coord {
        x: point.x().clamp(min_x, max_x),
        y: point.y().clamp(min_y, max_y),
    };
    let (dx, dy) = scale.meters(point, clamped);
    dx.hypot(dy)
}

fn point_line_distance(coords: &[Coord<f64>], point: Point<f64>, scale: &MetricScale) -> f64 {
    if coords.len() == 1 {
        let (dx, dy) = scale.meters(point, coords[0]);
        return dx.hypot(dy);
    }
    let mut best = f64::INFINITY;
    for w in coords.windows(2) {
        let (ax, ay) = scale.meters(point, w[0]);
        let (bx, by) = scale.meters(point, w[1]);
        best = best.min(point_segment_distance(ax, ay, bx, by));
    }
    best
}

/// Distance from the origin to the segment `(ax, ay)-(bx, by)`.
fn point_segment_distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq == 0.0 {
        0.0
    } else {
        (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0)
    };
    (ax + t * dx).hypot(ay + t * dy)
}
