//! GraphML round-trip codec.
//!
//! Every attribute value is stringified on write (booleans as
//! `True`/`False`, lists and structured values as compact JSON, geometries
//! as WKT) and recovered on read through a per-key type-coercion table.

use std::path::Path;

use geo::LineString;
use hashbrown::HashMap;
use log::warn;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use petgraph::visit::IntoEdgeReferences;
use quick_xml::{Reader, Writer};
use wkt::{ToWkt, TryFromWkt};

use crate::Error;
use crate::geometry::Crs;
use crate::model::{AttrValue, OsmId, StreetEdge, StreetGraph, StreetNode};

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";

/// Target type a stringified attribute is coerced back into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrType {
    Str,
    Float,
    Int,
    Bool,
    /// Integer scalar, or a JSON list of integers.
    IntOrList,
    /// WKT linestring.
    Geometry,
    Json,
}

/// Per-key coercions applied on load. Caller entries override the defaults.
#[derive(Debug, Clone, Default)]
pub struct CoercionTable {
    overrides: HashMap<String, AttrType>,
}

impl CoercionTable {
    pub fn with(mut self, key: &str, ty: AttrType) -> Self {
        self.overrides.insert(key.to_string(), ty);
        self
    }

    fn resolve(&self, key: &str) -> AttrType {
        if let Some(&ty) = self.overrides.get(key) {
            return ty;
        }
        match key {
            "x" | "y" | "elevation" | "bearing" | "grade" | "length" | "speed_kph"
            | "travel_time" => AttrType::Float,
            "osmid" => AttrType::IntOrList,
            "street_count" => AttrType::Int,
            "oneway" | "reversed" | "simplified" => AttrType::Bool,
            "geometry" => AttrType::Geometry,
            "merged_nodes" | "merged_edges" => AttrType::Json,
            _ => AttrType::Str,
        }
    }
}

fn bool_string(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn osmid_string(osmid: &[OsmId]) -> String {
    match osmid {
        [single] => single.to_string(),
        many => serde_json::to_string(many).unwrap_or_default(),
    }
}

fn attr_value_string(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => s.clone(),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Num(n) => n.to_string(),
        AttrValue::Bool(b) => bool_string(*b).to_string(),
        AttrValue::Geometry(line) => line.to_wkt().to_string(),
        other => serde_json::to_string(&other.to_json()).unwrap_or_default(),
    }
}

/// Ordered attribute names per scope, typed fields first, passthrough tags
/// alphabetical after.
fn collect_keys(graph: &StreetGraph) -> (Vec<String>, Vec<String>, Vec<String>) {
    let graph_keys = ["crs", "simplified", "created_date", "created_with"]
        .map(String::from)
        .to_vec();

    let mut node_keys = vec!["x".to_string(), "y".to_string()];
    let mut node_tags: Vec<String> = Vec::new();
    let mut any_street_count = false;
    let mut any_elevation = false;
    let mut any_merged_nodes = false;
    for idx in graph.node_indices() {
        let node = graph.node(idx);
        any_street_count |= node.street_count.is_some();
        any_elevation |= node.elevation.is_some();
        any_merged_nodes |= node.merged_nodes.is_some();
        for key in node.tags.keys() {
            if !node_tags.contains(key) {
                node_tags.push(key.clone());
            }
        }
    }
    if any_street_count {
        node_keys.push("street_count".to_string());
    }
    if any_elevation {
        node_keys.push("elevation".to_string());
    }
    if any_merged_nodes {
        node_keys.push("merged_nodes".to_string());
    }
    node_tags.sort();
    node_keys.extend(node_tags);

    let mut edge_keys = ["osmid", "length", "oneway", "reversed"]
        .map(String::from)
        .to_vec();
    let mut edge_tags: Vec<String> = Vec::new();
    let mut optional = [
        ("geometry", false),
        ("speed_kph", false),
        ("travel_time", false),
        ("grade", false),
        ("bearing", false),
        ("merged_edges", false),
    ];
    for edge in graph.graph.edge_weights() {
        optional[0].1 |= edge.geometry.is_some();
        optional[1].1 |= edge.speed_kph.is_some();
        optional[2].1 |= edge.travel_time.is_some();
        optional[3].1 |= edge.grade.is_some();
        optional[4].1 |= edge.bearing.is_some();
        optional[5].1 |= edge.merged_edges.is_some();
        for key in edge.tags.keys() {
            if !edge_tags.contains(key) {
                edge_tags.push(key.clone());
            }
        }
    }
    for (name, present) in optional {
        if present {
            edge_keys.push(name.to_string());
        }
    }
    edge_tags.sort();
    edge_keys.extend(edge_tags);

    (graph_keys, node_keys, edge_keys)
}

/// Serializes the graph to a standards-compliant GraphML string.
///
/// # Errors
///
/// I/O failures from the underlying writer.
pub fn graphml_to_string(graph: &StreetGraph) -> Result<String, Error> {
    let (graph_keys, node_keys, edge_keys) = collect_keys(graph);

    let mut key_ids: HashMap<String, String> = HashMap::new();
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut root = BytesStart::new("graphml");
    root.push_attribute(("xmlns", GRAPHML_NS));
    writer.write_event(Event::Start(root))?;

    let mut next_id = 0usize;
    for (scope, keys) in [
        ("graph", &graph_keys),
        ("node", &node_keys),
        ("edge", &edge_keys),
    ] {
        for name in keys {
            let id = format!("d{next_id}");
            next_id += 1;
            let mut key = BytesStart::new("key");
            key.push_attribute(("id", id.as_str()));
            key.push_attribute(("for", scope));
            key.push_attribute(("attr.name", name.as_str()));
            key.push_attribute(("attr.type", "string"));
            writer.write_event(Event::Empty(key))?;
            key_ids.insert(format!("{scope}/{name}"), id);
        }
    }

    let mut graph_el = BytesStart::new("graph");
    graph_el.push_attribute(("edgedefault", "directed"));
    writer.write_event(Event::Start(graph_el))?;

    for (name, value) in [
        ("crs", graph.meta.crs.code().to_string()),
        ("simplified", bool_string(graph.meta.simplified).to_string()),
        ("created_date", graph.meta.created_date.clone()),
        ("created_with", graph.meta.created_with.clone()),
    ] {
        write_data(&mut writer, &key_ids, "graph", name, &value)?;
    }

    for idx in graph.node_indices() {
        let node = graph.node(idx);
        let mut node_el = BytesStart::new("node");
        let id = node.id.to_string();
        node_el.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Start(node_el))?;

        write_data(&mut writer, &key_ids, "node", "x", &node.x.to_string())?;
        write_data(&mut writer, &key_ids, "node", "y", &node.y.to_string())?;
        if let Some(count) = node.street_count {
            write_data(&mut writer, &key_ids, "node", "street_count", &count.to_string())?;
        }
        if let Some(elevation) = node.elevation {
            write_data(&mut writer, &key_ids, "node", "elevation", &elevation.to_string())?;
        }
        if let Some(merged) = &node.merged_nodes {
            let json = serde_json::to_string(merged).unwrap_or_default();
            write_data(&mut writer, &key_ids, "node", "merged_nodes", &json)?;
        }
        for (key, value) in sorted_tags(&node.tags) {
            write_data(&mut writer, &key_ids, "node", key, &attr_value_string(value))?;
        }
        writer.write_event(Event::End(BytesEnd::new("node")))?;
    }

    for edge_ref in edge_refs(graph) {
        let (u, v, edge) = edge_ref;
        let mut edge_el = BytesStart::new("edge");
        let source = graph.node_id(u).to_string();
        let target = graph.node_id(v).to_string();
        let key = edge.key.to_string();
        edge_el.push_attribute(("source", source.as_str()));
        edge_el.push_attribute(("target", target.as_str()));
        edge_el.push_attribute(("id", key.as_str()));
        writer.write_event(Event::Start(edge_el))?;

        write_data(&mut writer, &key_ids, "edge", "osmid", &osmid_string(&edge.osmid))?;
        write_data(&mut writer, &key_ids, "edge", "length", &edge.length.to_string())?;
        write_data(&mut writer, &key_ids, "edge", "oneway", bool_string(edge.oneway))?;
        write_data(&mut writer, &key_ids, "edge", "reversed", bool_string(edge.reversed))?;
        if let Some(geometry) = &edge.geometry {
            let wkt = geometry.to_wkt().to_string();
            write_data(&mut writer, &key_ids, "edge", "geometry", &wkt)?;
        }
        for (name, value) in [
            ("speed_kph", edge.speed_kph),
            ("travel_time", edge.travel_time),
            ("grade", edge.grade),
            ("bearing", edge.bearing),
        ] {
            if let Some(value) = value {
                write_data(&mut writer, &key_ids, "edge", name, &value.to_string())?;
            }
        }
        if let Some(merged) = &edge.merged_edges {
            let pairs: Vec<[OsmId; 2]> = merged.iter().map(|&(a, b)| [a, b]).collect();
            let json = serde_json::to_string(&pairs).unwrap_or_default();
            write_data(&mut writer, &key_ids, "edge", "merged_edges", &json)?;
        }
        for (key, value) in sorted_tags(&edge.tags) {
            write_data(&mut writer, &key_ids, "edge", key, &attr_value_string(value))?;
        }
        writer.write_event(Event::End(BytesEnd::new("edge")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("graph")))?;
    writer.write_event(Event::End(BytesEnd::new("graphml")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::ValidationFailed(format!("non-UTF8 GraphML output: {e}")))
}

pub fn save_graphml(graph: &StreetGraph, path: &Path) -> Result<(), Error> {
    let xml = graphml_to_string(graph)?;
    std::fs::write(path, xml)?;
    Ok(())
}

fn sorted_tags(tags: &HashMap<String, AttrValue>) -> Vec<(&String, &AttrValue)> {
    let mut entries: Vec<_> = tags.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn edge_refs(
    graph: &StreetGraph,
) -> impl Iterator<Item = (petgraph::graph::NodeIndex, petgraph::graph::NodeIndex, &StreetEdge)> {
    use petgraph::visit::EdgeRef;
    graph
        .graph
        .edge_references()
        .map(|e| (e.source(), e.target(), e.weight()))
}

fn write_data(
    writer: &mut Writer<Vec<u8>>,
    key_ids: &HashMap<String, String>,
    scope: &str,
    name: &str,
    value: &str,
) -> Result<(), Error> {
    let Some(id) = key_ids.get(&format!("{scope}/{name}")) else {
        return Ok(());
    };
    let mut data = BytesStart::new("data");
    data.push_attribute(("key", id.as_str()));
    writer.write_event(Event::Start(data))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new("data")))?;
    Ok(())
}

/// Parses a GraphML document back into a street graph, applying the default
/// coercion table plus caller overrides.
///
/// # Errors
///
/// XML errors, or [`Error::ValidationFailed`] for nodes without coordinates.
pub fn graphml_from_str(
    xml: &str,
    coercions: Option<&CoercionTable>,
) -> Result<StreetGraph, Error> {
    let default_table = CoercionTable::default();
    let table = coercions.unwrap_or(&default_table);

    let mut reader = Reader::from_str(xml);
    let mut keys: HashMap<String, String> = HashMap::new();

    let mut graph_attrs: HashMap<String, String> = HashMap::new();
    let mut nodes: Vec<(String, HashMap<String, String>)> = Vec::new();
    let mut edges: Vec<(String, String, Option<String>, HashMap<String, String>)> = Vec::new();

    enum Scope {
        Graph,
        Node,
        Edge,
    }
    let mut scope = Scope::Graph;
    let mut data_key: Option<String> = None;
    let mut data_text = String::new();

    loop {
        match reader.read_event().map_err(Error::Xml)? {
            Event::Empty(start) | Event::Start(start)
                if start.local_name().as_ref() == b"key" =>
            {
                let attrs = xml_attrs(&start)?;
                if let (Some(id), Some(name)) = (attrs.get("id"), attrs.get("attr.name")) {
                    keys.insert(id.clone(), name.clone());
                }
            }
            Event::Start(start) => match start.local_name().as_ref() {
                b"node" => {
                    let attrs = xml_attrs(&start)?;
                    nodes.push((attrs.get("id").cloned().unwrap_or_default(), HashMap::new()));
                    scope = Scope::Node;
                }
                b"edge" => {
                    let attrs = xml_attrs(&start)?;
                    edges.push((
                        attrs.get("source").cloned().unwrap_or_default(),
                        attrs.get("target").cloned().unwrap_or_default(),
                        attrs.get("id").cloned(),
                        HashMap::new(),
                    ));
                    scope = Scope::Edge;
                }
                b"data" => {
                    let attrs = xml_attrs(&start)?;
                    data_key = attrs.get("key").cloned();
                    data_text.clear();
                }
                _ => {}
            },
            Event::Text(text) => {
                if data_key.is_some() {
                    data_text.push_str(
                        &text
                            .unescape()
                            .map_err(|e| Error::ValidationFailed(format!("bad GraphML text: {e}")))?,
                    );
                }
            }
            Event::End(end) => match end.local_name().as_ref() {
                b"data" => {
                    if let Some(id) = data_key.take() {
                        if let Some(name) = keys.get(&id) {
                            let target = match scope {
                                Scope::Node => match nodes.last_mut() {
                                    Some(node) => &mut node.1,
                                    None => &mut graph_attrs,
                                },
                                Scope::Edge => match edges.last_mut() {
                                    Some(edge) => &mut edge.3,
                                    None => &mut graph_attrs,
                                },
                                Scope::Graph => &mut graph_attrs,
                            };
                            target.insert(name.clone(), std::mem::take(&mut data_text));
                        }
                    }
                }
                b"node" | b"edge" => scope = Scope::Graph,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    assemble_graph(graph_attrs, nodes, edges, table)
}

pub fn load_graphml(path: &Path, coercions: Option<&CoercionTable>) -> Result<StreetGraph, Error> {
    let xml = std::fs::read_to_string(path)?;
    graphml_from_str(&xml, coercions)
}

fn xml_attrs(start: &BytesStart) -> Result<HashMap<String, String>, Error> {
    let mut out = HashMap::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| Error::ValidationFailed(format!("malformed GraphML attribute: {e}")))?;
        out.insert(
            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attr.value).into_owned(),
        );
    }
    Ok(out)
}

fn assemble_graph(
    graph_attrs: HashMap<String, String>,
    nodes: Vec<(String, HashMap<String, String>)>,
    edges: Vec<(String, String, Option<String>, HashMap<String, String>)>,
    table: &CoercionTable,
) -> Result<StreetGraph, Error> {
    let crs_code = graph_attrs
        .get("crs")
        .cloned()
        .unwrap_or_else(|| "epsg:4326".to_string());
    let mut graph = StreetGraph::new(Crs::from_code(&crs_code));
    if let Some(date) = graph_attrs.get("created_date") {
        graph.meta.created_date = date.clone();
    }
    if let Some(with) = graph_attrs.get("created_with") {
        graph.meta.created_with = with.clone();
    }
    graph.meta.simplified = graph_attrs
        .get("simplified")
        .and_then(|v| parse_bool(v))
        .unwrap_or(false);

    for (id, mut attrs) in nodes {
        let id: OsmId = id
            .parse()
            .map_err(|_| Error::ValidationFailed(format!("non-integer node id {id:?}")))?;
        let x = attrs.remove("x").and_then(|v| v.parse::<f64>().ok());
        let y = attrs.remove("y").and_then(|v| v.parse::<f64>().ok());
        let (Some(x), Some(y)) = (x, y) else {
            return Err(Error::ValidationFailed(format!(
                "node {id} is missing x/y coordinates"
            )));
        };

        let mut node = StreetNode::new(id, x, y);
        node.street_count = attrs.remove("street_count").and_then(|v| v.parse().ok());
        node.elevation = attrs.remove("elevation").and_then(|v| v.parse().ok());
        node.merged_nodes = attrs
            .remove("merged_nodes")
            .and_then(|v| serde_json::from_str::<Vec<OsmId>>(&v).ok());
        for (key, value) in attrs {
            if let Some(coerced) = coerce(&value, table.resolve(&key)) {
                node.tags.insert(key, coerced);
            }
        }
        graph.add_node(node);
    }

    let mut skipped = 0usize;
    for (source, target, key, mut attrs) in edges {
        let endpoints = (
            source.parse::<OsmId>().ok().and_then(|s| graph.node_index(s)),
            target.parse::<OsmId>().ok().and_then(|t| graph.node_index(t)),
        );
        let (Some(u), Some(v)) = endpoints else {
            skipped += 1;
            continue;
        };

        let osmid = match attrs.remove("osmid") {
            Some(raw) => parse_int_or_list(&raw).unwrap_or_default(),
            None => Vec::new(),
        };
        let mut edge = StreetEdge {
            osmid,
            key: key.and_then(|k| k.parse().ok()).unwrap_or(0),
            length: attrs
                .remove("length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(f64::NAN),
            oneway: attrs
                .remove("oneway")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            reversed: attrs
                .remove("reversed")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            geometry: attrs
                .remove("geometry")
                .and_then(|v| LineString::try_from_wkt_str(&v).ok()),
            speed_kph: attrs.remove("speed_kph").and_then(|v| v.parse().ok()),
            travel_time: attrs.remove("travel_time").and_then(|v| v.parse().ok()),
            grade: attrs.remove("grade").and_then(|v| v.parse().ok()),
            bearing: attrs.remove("bearing").and_then(|v| v.parse().ok()),
            merged_edges: attrs
                .remove("merged_edges")
                .and_then(|v| serde_json::from_str::<Vec<(OsmId, OsmId)>>(&v).ok()),
            tags: HashMap::new(),
        };
        for (tag_key, value) in attrs {
            if let Some(coerced) = coerce(&value, table.resolve(&tag_key)) {
                edge.tags.insert(tag_key, coerced);
            }
        }
        graph.add_edge_preserving_key(u, v, edge);
    }
    if skipped > 0 {
        warn!("skipped {skipped} GraphML edges referencing unknown nodes");
    }
    Ok(graph)
}

fn parse_int_or_list(raw: &str) -> Option<Vec<OsmId>> {
    if raw.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<OsmId>>(raw).ok()
    } else {
        raw.trim().parse::<OsmId>().ok().map(|id| vec![id])
    }
}

fn coerce(raw: &str, ty: AttrType) -> Option<AttrValue> {
    match ty {
        AttrType::Str => Some(AttrValue::Str(raw.to_string())),
        AttrType::Float => raw.parse::<f64>().ok().map(AttrValue::Num),
        AttrType::Int => raw.parse::<i64>().ok().map(AttrValue::Int),
        AttrType::Bool => parse_bool(raw).map(AttrValue::Bool),
        AttrType::IntOrList => parse_int_or_list(raw).map(|ids| match ids.as_slice() {
            [single] => AttrValue::Int(*single),
            _ => AttrValue::IntList(ids),
        }),
        AttrType::Geometry => LineString::try_from_wkt_str(raw).ok().map(AttrValue::Geometry),
        AttrType::Json => serde_json::from_str(raw).ok().map(AttrValue::Json),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Crs;
    use approx::assert_relative_eq;
    use geo::line_string;

    fn sample_graph() -> StreetGraph {
        let mut g = StreetGraph::new(Crs::wgs84());
        let mut a = StreetNode::new(1, 13.4, 52.5);
        a.street_count = Some(3);
        a.tags
            .insert("highway".to_string(), AttrValue::Str("crossing".to_string()));
        let a = g.add_node(a);
        let b = g.add_node(StreetNode::new(2, 13.5, 52.6));

        let mut e = StreetEdge::new(100, false);
        e.length = 1234.5;
        e.geometry = Some(line_string![(x: 13.4, y: 52.5), (x: 13.5, y: 52.6)]);
        e.tags
            .insert("name".to_string(), AttrValue::Str("Foo & Bar".to_string()));
        g.add_edge(a, b, e);

        let mut twin = StreetEdge::new(100, false);
        twin.reversed = true;
        twin.length = 1234.5;
        g.add_edge(b, a, twin);
        g
    }

    #[test]
    fn round_trip_preserves_structure_and_attributes() {
        let g = sample_graph();
        let xml = graphml_to_string(&g).unwrap();
        let loaded = graphml_from_str(&xml, None).unwrap();

        assert_eq!(loaded.node_count(), 2);
        assert_eq!(loaded.edge_count(), 2);
        assert_eq!(loaded.meta.crs, g.meta.crs);
        assert!(!loaded.meta.simplified);
        assert_eq!(loaded.meta.created_date, g.meta.created_date);

        let a = loaded.node_index(1).unwrap();
        let node = loaded.node(a);
        assert_relative_eq!(node.x, 13.4);
        assert_eq!(node.street_count, Some(3));
        assert_eq!(
            node.tags.get("highway"),
            Some(&AttrValue::Str("crossing".to_string()))
        );

        let b = loaded.node_index(2).unwrap();
        let forward = loaded.edges_between(a, b);
        assert_eq!(forward.len(), 1);
        let edge = forward[0].1;
        assert_relative_eq!(edge.length, 1234.5);
        assert_eq!(edge.osmid, vec![100]);
        assert!(!edge.oneway);
        assert_eq!(
            edge.tags.get("name"),
            Some(&AttrValue::Str("Foo & Bar".to_string()))
        );
        let geometry = edge.geometry.as_ref().unwrap();
        assert_eq!(geometry.0.len(), 2);
        assert_relative_eq!(geometry.0[1].y, 52.6);

        let backward = loaded.edges_between(b, a);
        assert!(backward[0].1.reversed);
    }

    #[test]
    fn booleans_serialize_title_case() {
        let g = sample_graph();
        let xml = graphml_to_string(&g).unwrap();
        assert!(xml.contains(">False<"));
        assert!(xml.contains("attr.type=\"string\""));
        assert!(xml.contains("edgedefault=\"directed\""));
    }

    #[test]
    fn osmid_lists_round_trip() {
        let mut g = sample_graph();
        let a = g.node_index(1).unwrap();
        let b = g.node_index(2).unwrap();
        let mut e = StreetEdge::new(0, true);
        e.osmid = vec![7, 8, 9];
        e.length = 10.0;
        g.add_edge(a, b, e);

        let xml = graphml_to_string(&g).unwrap();
        let loaded = graphml_from_str(&xml, None).unwrap();
        let a = loaded.node_index(1).unwrap();
        let b = loaded.node_index(2).unwrap();
        let edges = loaded.edges_between(a, b);
        assert!(edges.iter().any(|(_, e)| e.osmid == vec![7, 8, 9]));
    }

    #[test]
    fn caller_coercions_override_defaults() {
        let mut g = sample_graph();
        let a = g.node_index(1).unwrap();
        g.node_mut(a)
            .tags
            .insert("lanes".to_string(), AttrValue::Str("2".to_string()));

        let xml = graphml_to_string(&g).unwrap();
        let table = CoercionTable::default().with("lanes", AttrType::Int);
        let loaded = graphml_from_str(&xml, Some(&table)).unwrap();
        let a = loaded.node_index(1).unwrap();
        assert_eq!(loaded.node(a).tags.get("lanes"), Some(&AttrValue::Int(2)));
    }

    #[test]
    fn missing_coordinates_fail_validation() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<graphml xmlns="http://graphml.graphdrawing.org/xmlns">
  <key id="d0" for="node" attr.name="x" attr.type="string"/>
  <graph edgedefault="directed">
    <node id="1"><data key="d0">13.4</data></node>
  </graph>
</graphml>"#;
        assert!(matches!(
            graphml_from_str(xml, None),
            Err(Error::ValidationFailed(_))
        ));
    }

    #[test]
    fn simplified_flag_round_trips() {
        let mut g = sample_graph();
        g.meta.simplified = true;
        let xml = graphml_to_string(&g).unwrap();
        let loaded = graphml_from_str(&xml, None).unwrap();
        assert!(loaded.meta.simplified);
    }
}
