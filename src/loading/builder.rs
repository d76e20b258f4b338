use hashbrown::{HashMap, HashSet};
use log::{info, warn};

use crate::algo::{components, stats};
use crate::geometry::Crs;
use crate::loading::config::Settings;
use crate::loading::osm::{Element, ElementBatch};
use crate::model::{AttrValue, OsmId, StreetEdge, StreetGraph, StreetNode};
use crate::{Error, ONEWAY_VALUES, REVERSED_ONEWAY_VALUES};

/// Build-time choices that vary per graph rather than per deployment.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Network type the fetcher was filtered with; decides bidirectionality.
    pub network_type: String,
    /// Keep every weakly connected component instead of only the largest.
    pub retain_all: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            network_type: "drive".to_string(),
            retain_all: false,
        }
    }
}

struct RawNode {
    id: OsmId,
    lat: f64,
    lon: f64,
    tags: HashMap<String, String>,
}

struct RawPath {
    osmid: OsmId,
    nodes: Vec<OsmId>,
    tags: HashMap<String, String>,
}

/// Builds a street graph from ordered fetcher response batches.
///
/// Each batch is fully consumed before the next; the first batch error
/// aborts the build.
///
/// # Errors
///
/// Returns [`Error::EmptyResponse`] when the batches contain neither nodes
/// nor ways, or the propagated failure of any batch.
pub fn graph_from_elements<I>(
    batches: I,
    settings: &Settings,
    options: &BuildOptions,
) -> Result<StreetGraph, Error>
where
    I: IntoIterator<Item = Result<ElementBatch, Error>>,
{
    let (nodes, paths) = partition_elements(batches)?;
    if nodes.is_empty() && paths.is_empty() {
        return Err(Error::EmptyResponse);
    }
    info!(
        "building graph from {} nodes and {} paths",
        nodes.len(),
        paths.len()
    );

    let mut graph = StreetGraph::new(Crs::from_code(&settings.default_crs));

    for raw in &nodes {
        let mut node = StreetNode::new(raw.id, raw.lon, raw.lat);
        for key in &settings.useful_tags_node {
            if let Some(value) = raw.tags.get(key) {
                node.tags.insert(key.clone(), AttrValue::Str(value.clone()));
            }
        }
        graph.add_node(node);
    }

    let bidirectional = settings
        .bidirectional_network_types
        .iter()
        .any(|t| t == &options.network_type);

    let mut missing_refs = 0usize;
    for path in &paths {
        add_path(&mut graph, settings, path, bidirectional, &mut missing_refs);
    }
    if missing_refs > 0 {
        warn!("skipped {missing_refs} edge segments referencing unknown nodes");
    }

    stamp_edge_lengths(&mut graph);
    stats::stamp_street_counts(&mut graph);

    if !options.retain_all && graph.node_count() > 0 {
        let graph = components::largest_component(&graph, false);
        info!(
            "retained largest weakly connected component: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        return Ok(graph);
    }
    Ok(graph)
}

/// Builds a street graph from a local map-XML file as a single batch.
pub fn graph_from_xml(
    path: &std::path::Path,
    settings: &Settings,
    options: &BuildOptions,
) -> Result<StreetGraph, Error> {
    let batch = crate::loading::osm::xml::elements_from_file(path)?;
    graph_from_elements(std::iter::once(Ok(batch)), settings, options)
}

fn partition_elements<I>(batches: I) -> Result<(Vec<RawNode>, Vec<RawPath>), Error>
where
    I: IntoIterator<Item = Result<ElementBatch, Error>>,
{
    let mut nodes: Vec<RawNode> = Vec::new();
    let mut seen_nodes: HashSet<OsmId> = HashSet::new();
    let mut paths: Vec<RawPath> = Vec::new();
    let mut seen_paths: HashSet<OsmId> = HashSet::new();

    for batch in batches {
        for element in batch?.elements {
            match element {
                Element::Node { id, lat, lon, tags } => {
                    if seen_nodes.insert(id) {
                        nodes.push(RawNode { id, lat, lon, tags });
                    }
                }
                Element::Way { id, nodes: refs, tags } => {
                    if seen_paths.insert(id) {
                        paths.push(RawPath {
                            osmid: id,
                            nodes: dedup_consecutive(refs),
                            tags,
                        });
                    }
                }
            }
        }
    }
    Ok((nodes, paths))
}

fn dedup_consecutive(refs: Vec<OsmId>) -> Vec<OsmId> {
    let mut out: Vec<OsmId> = Vec::with_capacity(refs.len());
    for id in refs {
        if out.last() != Some(&id) {
            out.push(id);
        }
    }
    out
}

/// Decides traversability of a path by the ordered oneway rules, and whether
/// its node sequence must be walked in reverse.
fn oneway_and_reversal(
    tags: &HashMap<String, String>,
    settings: &Settings,
    bidirectional: bool,
) -> (bool, bool) {
    let oneway_tag = tags.get("oneway").map(String::as_str);

    let oneway = if settings.all_oneway {
        true
    } else if bidirectional {
        false
    } else if matches!(oneway_tag, Some(v) if ONEWAY_VALUES.contains(&v)) {
        true
    } else {
        tags.get("junction").map(String::as_str) == Some("roundabout")
    };

    let reversed =
        oneway && matches!(oneway_tag, Some(v) if REVERSED_ONEWAY_VALUES.contains(&v));
    (oneway, reversed)
}

fn add_path(
    graph: &mut StreetGraph,
    settings: &Settings,
    path: &RawPath,
    bidirectional: bool,
    missing_refs: &mut usize,
) {
    let (oneway, reverse_sequence) = oneway_and_reversal(&path.tags, settings, bidirectional);

    let mut sequence = path.nodes.clone();
    if reverse_sequence {
        sequence.reverse();
    }

    let mut tags: HashMap<String, AttrValue> = HashMap::new();
    for key in &settings.useful_tags_way {
        if let Some(value) = path.tags.get(key) {
            tags.insert(key.clone(), AttrValue::Str(value.clone()));
        }
    }

    for pair in sequence.windows(2) {
        let (u, v) = match (graph.node_index(pair[0]), graph.node_index(pair[1])) {
            (Some(u), Some(v)) => (u, v),
            _ => {
                *missing_refs += 1;
                continue;
            }
        };

        let mut edge = StreetEdge::new(path.osmid, oneway);
        edge.tags = tags.clone();
        graph.add_edge(u, v, edge);

        if !oneway {
            let mut twin = StreetEdge::new(path.osmid, oneway);
            twin.reversed = true;
            twin.tags = tags.clone();
            graph.add_edge(v, u, twin);
        }
    }
}

/// Stamps `length` on every edge from the great-circle (or planar, for a
/// projected CRS) distance between its endpoint coordinates.
fn stamp_edge_lengths(graph: &mut StreetGraph) {
    let crs = graph.meta.crs.clone();
    let edges: Vec<_> = graph.graph.edge_indices().collect();
    for idx in edges {
        if let Some((u, v)) = graph.edge_endpoints(idx) {
            let length = crs.distance(graph.node(u).point(), graph.node(v).point());
            graph.edge_mut(idx).length = length;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::great_circle;
    use approx::assert_relative_eq;

    fn node(id: OsmId, lat: f64, lon: f64) -> Element {
        Element::Node {
            id,
            lat,
            lon,
            tags: HashMap::new(),
        }
    }

    fn way(id: OsmId, nodes: Vec<OsmId>, tags: &[(&str, &str)]) -> Element {
        Element::Way {
            id,
            nodes,
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn build(elements: Vec<Element>) -> StreetGraph {
        let options = BuildOptions {
            retain_all: true,
            ..BuildOptions::default()
        };
        graph_from_elements(
            std::iter::once(Ok(ElementBatch::new(elements))),
            &Settings::default(),
            &options,
        )
        .unwrap()
    }

    #[test]
    fn empty_batches_fail() {
        let result = graph_from_elements(
            std::iter::once(Ok(ElementBatch::default())),
            &Settings::default(),
            &BuildOptions::default(),
        );
        assert!(matches!(result, Err(Error::EmptyResponse)));
    }

    #[test]
    fn reversed_oneway_reverses_the_sequence_not_the_flag() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            node(3, 0.002, 0.0),
            way(100, vec![1, 2, 3], &[("highway", "residential"), ("oneway", "-1")]),
        ]);

        assert_eq!(g.edge_count(), 2);
        let n1 = g.node_index(1).unwrap();
        let n2 = g.node_index(2).unwrap();
        let n3 = g.node_index(3).unwrap();

        let e32 = g.edges_between(n3, n2);
        let e21 = g.edges_between(n2, n1);
        assert_eq!(e32.len(), 1);
        assert_eq!(e21.len(), 1);
        assert!(!e32[0].1.reversed);
        assert!(!e21[0].1.reversed);
        assert!(e32[0].1.oneway);
        assert!(g.edges_between(n1, n2).is_empty());
    }

    #[test]
    fn bidirectional_ways_get_reciprocal_twins() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            way(100, vec![1, 2], &[("highway", "residential")]),
        ]);

        let n1 = g.node_index(1).unwrap();
        let n2 = g.node_index(2).unwrap();
        let forward = g.edges_between(n1, n2);
        let backward = g.edges_between(n2, n1);
        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert!(!forward[0].1.reversed);
        assert!(backward[0].1.reversed);
    }

    #[test]
    fn bidirectional_network_type_overrides_oneway_tag() {
        let options = BuildOptions {
            network_type: "walk".to_string(),
            retain_all: true,
        };
        let g = graph_from_elements(
            std::iter::once(Ok(ElementBatch::new(vec![
                node(1, 0.0, 0.0),
                node(2, 0.001, 0.0),
                way(100, vec![1, 2], &[("highway", "footway"), ("oneway", "yes")]),
            ]))),
            &Settings::default(),
            &options,
        )
        .unwrap();
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn roundabouts_are_oneway() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            way(100, vec![1, 2], &[("junction", "roundabout")]),
        ]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn lengths_match_great_circle() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            way(100, vec![1, 2], &[("highway", "residential")]),
        ]);
        let n1 = g.node_index(1).unwrap();
        let n2 = g.node_index(2).unwrap();
        let edge = g.edges_between(n1, n2)[0].1;
        assert_relative_eq!(
            edge.length,
            great_circle(0.0, 0.0, 0.001, 0.0),
            max_relative = 1e-12
        );
        assert!(edge.length > 0.0);
    }

    #[test]
    fn consecutive_duplicate_refs_are_dropped() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            way(100, vec![1, 1, 2, 2], &[("highway", "residential"), ("oneway", "yes")]),
        ]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn segments_with_unknown_nodes_are_skipped() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            way(100, vec![1, 99, 2], &[("highway", "residential"), ("oneway", "yes")]),
        ]);
        // both consecutive pairs touch node 99, which was never delivered
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn street_counts_are_stamped() {
        let g = build(vec![
            node(1, 0.0, 0.0),
            node(2, 0.001, 0.0),
            node(3, 0.002, 0.0),
            way(100, vec![1, 2, 3], &[("highway", "residential")]),
        ]);
        let mid = g.node_index(2).unwrap();
        assert_eq!(g.node(mid).street_count, Some(2));
        let end = g.node_index(1).unwrap();
        assert_eq!(g.node(end).street_count, Some(1));
    }
}
