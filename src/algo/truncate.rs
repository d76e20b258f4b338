//! Spatial truncation: clipping the graph by bbox, polygon, or network
//! distance from a source node.

use geo::{BoundingRect, Intersects, LineString, MultiPolygon, Point};
use hashbrown::HashSet;
use log::info;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::Error;
use crate::geometry::Bbox;
use crate::index::quadrat;
use crate::model::{OsmId, StreetGraph};
use crate::routing::Weight;
use crate::routing::dijkstra::dijkstra;

/// Drops nodes outside the bbox. With `truncate_by_edge`, an outside node
/// survives if any incident edge's geometry (or straight endpoint segment)
/// intersects the bbox.
pub fn truncate_by_bbox(graph: &mut StreetGraph, bbox: &Bbox, truncate_by_edge: bool) {
    let mut outside: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|&n| {
            let node = graph.node(n);
            !bbox.contains(node.x, node.y)
        })
        .collect();

    if truncate_by_edge {
        let clip = bbox.to_polygon();
        outside.retain(|&n| !has_intersecting_incident_edge(graph, n, &clip));
    }

    let dropped = outside.len();
    graph.remove_nodes(&outside);
    info!("bbox truncation dropped {dropped} nodes, {} remain", graph.node_count());
}

fn has_intersecting_incident_edge(
    graph: &StreetGraph,
    node: NodeIndex,
    clip: &geo::Polygon<f64>,
) -> bool {
    let incident = graph
        .graph
        .edges_directed(node, Direction::Outgoing)
        .chain(graph.graph.edges_directed(node, Direction::Incoming));

    for edge in incident {
        let line: LineString<f64> = match &edge.weight().geometry {
            Some(geometry) => geometry.clone(),
            None => {
                let u = graph.node(edge.source());
                let v = graph.node(edge.target());
                if !(u.has_coords() && v.has_coords()) {
                    continue;
                }
                crate::geometry::straight_line(u.x, u.y, v.x, v.y)
            }
        };
        if line.intersects(clip) {
            return true;
        }
    }
    false
}

/// Drops every node whose point does not lie within the (multi)polygon.
/// Membership tests run through the quadrat accelerator.
///
/// # Errors
///
/// [`Error::InvalidInput`] when the polygon is empty.
pub fn truncate_by_polygon(
    graph: &mut StreetGraph,
    polygon: &MultiPolygon<f64>,
) -> Result<(), Error> {
    let rect = polygon
        .bounding_rect()
        .ok_or_else(|| Error::InvalidInput("polygon truncation needs a non-empty polygon".to_string()))?;
    // Aim for roughly a 10x10 quadrat grid over the polygon's extent.
    let width = (rect.width().max(rect.height()) / 10.0).max(f64::MIN_POSITIVE);

    let nodes: Vec<NodeIndex> = graph.node_indices().collect();
    let points: Vec<Point<f64>> = nodes.iter().map(|&n| graph.node(n).point()).collect();

    let mut inside: HashSet<usize> = HashSet::new();
    for poly in &polygon.0 {
        inside.extend(quadrat::points_within(poly, &points, width)?);
    }

    let to_drop: Vec<NodeIndex> = nodes
        .iter()
        .enumerate()
        .filter(|(i, _)| !inside.contains(i))
        .map(|(_, &n)| n)
        .collect();
    let dropped = to_drop.len();
    graph.remove_nodes(&to_drop);
    info!("polygon truncation dropped {dropped} nodes, {} remain", graph.node_count());
    Ok(())
}

/// Drops every node farther than `max_dist` (by the given edge weight) from
/// the source node, along with everything unreachable.
///
/// # Errors
///
/// [`Error::InvalidInput`] when the source node is not in the graph.
pub fn truncate_by_distance(
    graph: &mut StreetGraph,
    source: OsmId,
    max_dist: f64,
    weight: &Weight,
) -> Result<(), Error> {
    let src = graph
        .node_index(source)
        .ok_or_else(|| Error::InvalidInput(format!("node {source} is not in the graph")))?;

    let tree = dijkstra(graph, src, None, weight, Some(max_dist), None);
    let to_drop: Vec<NodeIndex> = graph
        .node_indices()
        .filter(|n| !matches!(tree.cost_to(*n), Some(dist) if dist <= max_dist))
        .collect();

    let dropped = to_drop.len();
    graph.remove_nodes(&to_drop);
    info!("distance truncation dropped {dropped} nodes, {} remain", graph.node_count());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Crs;
    use crate::model::{StreetEdge, StreetNode};

    fn edge(length: f64) -> StreetEdge {
        let mut e = StreetEdge::new(0, true);
        e.length = length;
        e
    }

    #[test]
    fn strict_bbox_drops_outside_nodes_and_their_edges() {
        let mut g = StreetGraph::new(Crs::wgs84());
        let a = g.add_node(StreetNode::new(1, 0.5, 0.5));
        let b = g.add_node(StreetNode::new(2, 2.0, 2.0));
        g.add_edge(a, b, edge(1.0));

        let bbox = Bbox::new(1.0, 0.0, 1.0, 0.0).unwrap();
        truncate_by_bbox(&mut g, &bbox, false);

        assert!(g.node_index(1).is_some());
        assert!(g.node_index(2).is_none());
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn edge_aware_bbox_reprieves_crossing_edges() {
        let mut g = StreetGraph::new(Crs::wgs84());
        let a = g.add_node(StreetNode::new(1, 0.5, 0.5));
        let b = g.add_node(StreetNode::new(2, 2.0, 2.0));
        g.add_edge(a, b, edge(1.0));

        let bbox = Bbox::new(1.0, 0.0, 1.0, 0.0).unwrap();
        truncate_by_bbox(&mut g, &bbox, true);

        assert!(g.node_index(2).is_some());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn edge_aware_bbox_still_drops_detached_nodes() {
        let mut g = StreetGraph::new(Crs::wgs84());
        g.add_node(StreetNode::new(1, 0.5, 0.5));
        g.add_node(StreetNode::new(9, 5.0, 5.0));

        let bbox = Bbox::new(1.0, 0.0, 1.0, 0.0).unwrap();
        truncate_by_bbox(&mut g, &bbox, true);
        assert!(g.node_index(9).is_none());
    }

    #[test]
    fn polygon_truncation_keeps_inside_nodes() {
        let mut g = StreetGraph::new(Crs::wgs84());
        g.add_node(StreetNode::new(1, 0.25, 0.25));
        g.add_node(StreetNode::new(2, 3.0, 3.0));

        let polygon = MultiPolygon::new(vec![
            Bbox::new(1.0, 0.0, 1.0, 0.0).unwrap().to_polygon(),
        ]);
        truncate_by_polygon(&mut g, &polygon).unwrap();

        assert!(g.node_index(1).is_some());
        assert!(g.node_index(2).is_none());
    }

    #[test]
    fn distance_truncation_drops_far_and_unreachable() {
        let mut g = StreetGraph::new(Crs::Projected {
            code: "epsg:32632".to_string(),
        });
        let a = g.add_node(StreetNode::new(1, 0.0, 0.0));
        let b = g.add_node(StreetNode::new(2, 100.0, 0.0));
        let c = g.add_node(StreetNode::new(3, 300.0, 0.0));
        g.add_node(StreetNode::new(4, 9_999.0, 0.0));
        g.add_edge(a, b, edge(100.0));
        g.add_edge(b, c, edge(200.0));

        truncate_by_distance(&mut g, 1, 150.0, &Weight::Length).unwrap();

        assert!(g.node_index(1).is_some());
        assert!(g.node_index(2).is_some());
        assert!(g.node_index(3).is_none());
        assert!(g.node_index(4).is_none());
    }
}
