//! GeoJSON exchange: node/edge FeatureCollections and their inverse.

use geo::LineString;
use geojson::{Feature, FeatureCollection, Geometry, Value as GeoJsonValue};
use log::warn;
use petgraph::visit::IntoEdgeReferences;
use serde_json::{Map, Value as JsonValue, json};

use crate::Error;
use crate::geometry::Crs;
use crate::model::{AttrValue, OsmId, StreetEdge, StreetGraph, StreetNode};

/// Paired node and edge feature collections derived from one graph.
/// The features copy attribute values out; they share no state with the
/// source graph.
#[derive(Debug, Clone)]
pub struct GraphGeoJson {
    pub nodes: FeatureCollection,
    pub edges: FeatureCollection,
}

pub fn graph_to_geojson(graph: &StreetGraph) -> GraphGeoJson {
    let mut node_features = Vec::with_capacity(graph.node_count());
    for idx in graph.node_indices() {
        let node = graph.node(idx);
        let mut properties = Map::new();
        properties.insert("id".to_string(), json!(node.id));
        properties.insert("x".to_string(), json!(node.x));
        properties.insert("y".to_string(), json!(node.y));
        if let Some(count) = node.street_count {
            properties.insert("street_count".to_string(), json!(count));
        }
        if let Some(elevation) = node.elevation {
            properties.insert("elevation".to_string(), json!(elevation));
        }
        if let Some(merged) = &node.merged_nodes {
            properties.insert("merged_nodes".to_string(), json!(merged));
        }
        for (key, value) in &node.tags {
            properties.insert(key.clone(), value.to_json());
        }

        node_features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(GeoJsonValue::from(&node.point()))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    let mut edge_features = Vec::with_capacity(graph.edge_count());
    use petgraph::visit::EdgeRef;
    for edge_ref in graph.graph.edge_references() {
        let edge = edge_ref.weight();
        let u = graph.node(edge_ref.source());
        let v = graph.node(edge_ref.target());

        let line = match &edge.geometry {
            Some(geometry) => geometry.clone(),
            None => crate::geometry::straight_line(u.x, u.y, v.x, v.y),
        };

        let mut properties = Map::new();
        properties.insert("id".to_string(), json!(edge.key));
        properties.insert("source".to_string(), json!(u.id));
        properties.insert("target".to_string(), json!(v.id));
        properties.insert(
            "osmid".to_string(),
            match edge.osmid.as_slice() {
                [single] => json!(single),
                many => json!(many),
            },
        );
        properties.insert("length".to_string(), json!(edge.length));
        properties.insert("oneway".to_string(), json!(edge.oneway));
        properties.insert("reversed".to_string(), json!(edge.reversed));
        for (name, value) in [
            ("speed_kph", edge.speed_kph),
            ("travel_time", edge.travel_time),
            ("grade", edge.grade),
            ("bearing", edge.bearing),
        ] {
            if let Some(value) = value {
                properties.insert(name.to_string(), json!(value));
            }
        }
        for (key, value) in &edge.tags {
            properties.insert(key.clone(), value.to_json());
        }

        edge_features.push(Feature {
            bbox: None,
            geometry: Some(Geometry::new(GeoJsonValue::from(&line))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        });
    }

    GraphGeoJson {
        nodes: FeatureCollection {
            features: node_features,
            bbox: None,
            foreign_members: None,
        },
        edges: FeatureCollection {
            features: edge_features,
            bbox: None,
            foreign_members: None,
        },
    }
}

fn property_i64(properties: &Map<String, JsonValue>, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| properties.get(*k)?.as_i64())
}

fn feature_point(feature: &Feature) -> Option<(f64, f64)> {
    let geometry = feature.geometry.as_ref()?;
    match &geometry.value {
        GeoJsonValue::Point(coords) if coords.len() >= 2 => Some((coords[0], coords[1])),
        _ => None,
    }
}

fn feature_linestring(feature: &Feature) -> Option<LineString<f64>> {
    let geometry = feature.geometry.as_ref()?;
    match &geometry.value {
        GeoJsonValue::LineString(coords) if coords.len() >= 2 => Some(LineString::from(
            coords
                .iter()
                .map(|c| (c[0], c[1]))
                .collect::<Vec<(f64, f64)>>(),
        )),
        _ => None,
    }
}

const NODE_RESERVED: &[&str] = &["id", "osmid", "x", "y", "street_count", "elevation", "merged_nodes"];
const EDGE_RESERVED: &[&str] = &[
    "id", "key", "u", "v", "source", "target", "osmid", "length", "oneway", "reversed",
    "speed_kph", "travel_time", "grade", "bearing", "merged_edges",
];

/// Rebuilds a graph from node/edge feature collections.
///
/// Node ids come from the `osmid` or `id` property; edge endpoints from
/// `u`/`v` or `source`/`target`. Features that cannot be resolved are
/// skipped with a warning, or fail the whole load in strict mode.
///
/// # Errors
///
/// [`Error::ValidationFailed`] in strict mode for any skipped feature.
pub fn graph_from_features(
    nodes: &FeatureCollection,
    edges: &FeatureCollection,
    crs: Crs,
    strict: bool,
) -> Result<StreetGraph, Error> {
    let mut graph = StreetGraph::new(crs);
    let empty = Map::new();

    let mut skipped_nodes = 0usize;
    for feature in &nodes.features {
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let id = property_i64(properties, &["osmid", "id"]);
        let coords = feature_point(feature).or_else(|| {
            match (
                properties.get("x").and_then(JsonValue::as_f64),
                properties.get("y").and_then(JsonValue::as_f64),
            ) {
                (Some(x), Some(y)) => Some((x, y)),
                _ => None,
            }
        });

        let (Some(id), Some((x, y))) = (id, coords) else {
            if strict {
                return Err(Error::ValidationFailed(
                    "node feature without id or coordinates".to_string(),
                ));
            }
            skipped_nodes += 1;
            continue;
        };

        let mut node = StreetNode::new(id, x, y);
        node.street_count = properties
            .get("street_count")
            .and_then(JsonValue::as_u64)
            .map(|c| c as u32);
        node.elevation = properties.get("elevation").and_then(JsonValue::as_f64);
        node.merged_nodes = properties
            .get("merged_nodes")
            .and_then(|v| serde_json::from_value::<Vec<OsmId>>(v.clone()).ok());
        for (key, value) in properties {
            if NODE_RESERVED.contains(&key.as_str()) {
                continue;
            }
            if let Some(attr) = AttrValue::from_json(value) {
                node.tags.insert(key.clone(), attr);
            }
        }
        graph.add_node(node);
    }
    if skipped_nodes > 0 {
        warn!("skipped {skipped_nodes} node features without id or coordinates");
    }

    let mut skipped_edges = 0usize;
    for feature in &edges.features {
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let u = property_i64(properties, &["u", "source"]);
        let v = property_i64(properties, &["v", "target"]);
        let endpoints = match (u, v) {
            (Some(u), Some(v)) => match (graph.node_index(u), graph.node_index(v)) {
                (Some(ui), Some(vi)) => Some((ui, vi)),
                _ => None,
            },
            _ => None,
        };
        let Some((ui, vi)) = endpoints else {
            if strict {
                return Err(Error::ValidationFailed(
                    "edge feature referencing unknown nodes".to_string(),
                ));
            }
            skipped_edges += 1;
            continue;
        };

        let osmid = match properties.get("osmid") {
            Some(JsonValue::Number(n)) => n.as_i64().map(|i| vec![i]).unwrap_or_default(),
            Some(JsonValue::Array(items)) => {
                items.iter().filter_map(JsonValue::as_i64).collect()
            }
            _ => Vec::new(),
        };

        let mut edge = StreetEdge {
            osmid,
            key: property_i64(properties, &["key", "id"]).unwrap_or(0) as u32,
            length: properties
                .get("length")
                .and_then(JsonValue::as_f64)
                .unwrap_or(f64::NAN),
            oneway: properties
                .get("oneway")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            reversed: properties
                .get("reversed")
                .and_then(JsonValue::as_bool)
                .unwrap_or(false),
            geometry: feature_linestring(feature),
            speed_kph: properties.get("speed_kph").and_then(JsonValue::as_f64),
            travel_time: properties.get("travel_time").and_then(JsonValue::as_f64),
            grade: properties.get("grade").and_then(JsonValue::as_f64),
            bearing: properties.get("bearing").and_then(JsonValue::as_f64),
            merged_edges: properties
                .get("merged_edges")
                .and_then(|v| serde_json::from_value::<Vec<(OsmId, OsmId)>>(v.clone()).ok()),
            tags: hashbrown::HashMap::new(),
        };
        for (key, value) in properties {
            if EDGE_RESERVED.contains(&key.as_str()) {
                continue;
            }
            if let Some(attr) = AttrValue::from_json(value) {
                edge.tags.insert(key.clone(), attr);
            }
        }
        graph.add_edge_preserving_key(ui, vi, edge);
    }
    if skipped_edges > 0 {
        warn!("skipped {skipped_edges} edge features referencing unknown nodes");
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Crs;
    use geo::line_string;

    fn sample_graph() -> StreetGraph {
        let mut g = StreetGraph::new(Crs::wgs84());
        let a = g.add_node(StreetNode::new(1, 13.4, 52.5));
        let b = g.add_node(StreetNode::new(2, 13.5, 52.6));
        let mut e = StreetEdge::new(100, true);
        e.length = 1000.0;
        e.geometry = Some(line_string![
            (x: 13.4, y: 52.5),
            (x: 13.45, y: 52.55),
            (x: 13.5, y: 52.6)
        ]);
        e.tags.insert(
            "highway".to_string(),
            AttrValue::Str("residential".to_string()),
        );
        g.add_edge(a, b, e);
        g
    }

    #[test]
    fn node_features_carry_id_and_point() {
        let gj = graph_to_geojson(&sample_graph());
        assert_eq!(gj.nodes.features.len(), 2);
        let first = &gj.nodes.features[0];
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props.get("id").unwrap().as_i64(), Some(1));
        match &first.geometry.as_ref().unwrap().value {
            GeoJsonValue::Point(coords) => {
                assert_eq!(coords[0], 13.4);
                assert_eq!(coords[1], 52.5);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn edge_features_use_stored_geometry() {
        let gj = graph_to_geojson(&sample_graph());
        let edge = &gj.edges.features[0];
        match &edge.geometry.as_ref().unwrap().value {
            GeoJsonValue::LineString(coords) => assert_eq!(coords.len(), 3),
            other => panic!("expected linestring, got {other:?}"),
        }
        let props = edge.properties.as_ref().unwrap();
        assert_eq!(props.get("source").unwrap().as_i64(), Some(1));
        assert_eq!(props.get("target").unwrap().as_i64(), Some(2));
        assert_eq!(props.get("osmid").unwrap().as_i64(), Some(100));
    }

    #[test]
    fn round_trip_preserves_graph() {
        let g = sample_graph();
        let gj = graph_to_geojson(&g);
        let rebuilt = graph_from_features(&gj.nodes, &gj.edges, g.meta.crs.clone(), true).unwrap();

        assert_eq!(rebuilt.node_count(), 2);
        assert_eq!(rebuilt.edge_count(), 1);
        let a = rebuilt.node_index(1).unwrap();
        let b = rebuilt.node_index(2).unwrap();
        let edge = rebuilt.edges_between(a, b)[0].1;
        assert_eq!(edge.osmid, vec![100]);
        assert!(edge.oneway);
        assert_eq!(
            edge.tags.get("highway"),
            Some(&AttrValue::Str("residential".to_string()))
        );
        assert_eq!(edge.geometry.as_ref().unwrap().0.len(), 3);
    }

    #[test]
    fn unknown_endpoints_are_skipped_or_fatal() {
        let g = sample_graph();
        let mut gj = graph_to_geojson(&g);
        // point the edge at a node that does not exist
        let props = gj.edges.features[0].properties.as_mut().unwrap();
        props.insert("target".to_string(), json!(999));

        let lenient =
            graph_from_features(&gj.nodes, &gj.edges, Crs::wgs84(), false).unwrap();
        assert_eq!(lenient.edge_count(), 0);

        assert!(matches!(
            graph_from_features(&gj.nodes, &gj.edges, Crs::wgs84(), true),
            Err(Error::ValidationFailed(_))
        ));
    }
}
