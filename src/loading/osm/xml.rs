//! Reader for local map-XML files.
//!
//! Only `node` and `way` elements are kept; relations have no graph
//! counterpart and are skipped.

use std::path::Path;

use hashbrown::HashMap;
use log::warn;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Element, ElementBatch};
use crate::Error;
use crate::model::OsmId;

/// Reads all usable elements from a map-XML file into one batch.
///
/// # Errors
///
/// Fails on I/O problems or malformed XML. Elements with unparsable ids or
/// coordinates are skipped and counted at WARNING level.
pub fn elements_from_file(path: &Path) -> Result<ElementBatch, Error> {
    let xml = std::fs::read_to_string(path)?;
    elements_from_str(&xml)
}

pub fn elements_from_str(xml: &str) -> Result<ElementBatch, Error> {
    let mut reader = Reader::from_str(xml);
    let mut elements = Vec::new();
    let mut current: Option<Element> = None;
    let mut skipped = 0usize;

    loop {
        match reader.read_event().map_err(Error::Xml)? {
            Event::Empty(start) => match start.local_name().as_ref() {
                b"node" => match parse_node(&start)? {
                    Some(node) => elements.push(node),
                    None => skipped += 1,
                },
                b"tag" => {
                    if let Some(tags) = current_tags(&mut current) {
                        let attrs = attr_map(&start)?;
                        if let (Some(k), Some(v)) = (attrs.get("k"), attrs.get("v")) {
                            tags.insert(k.clone(), v.clone());
                        }
                    }
                }
                b"nd" => {
                    if let Some(Element::Way { nodes, .. }) = current.as_mut() {
                        match attr_map(&start)?.get("ref").and_then(|r| r.parse().ok()) {
                            Some(node_ref) => nodes.push(node_ref),
                            None => skipped += 1,
                        }
                    }
                }
                _ => {}
            },

            Event::Start(start) => match start.local_name().as_ref() {
                b"node" => {
                    current = parse_node(&start)?;
                    if current.is_none() {
                        skipped += 1;
                    }
                }
                b"way" => match attr_map(&start)?.get("id").and_then(|v| v.parse::<OsmId>().ok()) {
                    Some(id) => {
                        current = Some(Element::Way {
                            id,
                            nodes: Vec::new(),
                            tags: HashMap::new(),
                        });
                    }
                    None => skipped += 1,
                },
                _ => {}
            },

            Event::End(end) => match end.local_name().as_ref() {
                b"node" | b"way" => {
                    if let Some(element) = current.take() {
                        elements.push(element);
                    }
                }
                _ => {}
            },

            Event::Eof => break,
            _ => {}
        }
    }

    if skipped > 0 {
        warn!("skipped {skipped} malformed elements while reading map XML");
    }
    Ok(ElementBatch::new(elements))
}

fn parse_node(start: &BytesStart) -> Result<Option<Element>, Error> {
    let attrs = attr_map(start)?;
    let id = attrs.get("id").and_then(|v| v.parse::<OsmId>().ok());
    let lat = attrs.get("lat").and_then(|v| v.parse::<f64>().ok());
    let lon = attrs.get("lon").and_then(|v| v.parse::<f64>().ok());
    Ok(match (id, lat, lon) {
        (Some(id), Some(lat), Some(lon)) => Some(Element::Node {
            id,
            lat,
            lon,
            tags: HashMap::new(),
        }),
        _ => None,
    })
}

fn current_tags(current: &mut Option<Element>) -> Option<&mut HashMap<String, String>> {
    match current.as_mut() {
        Some(Element::Node { tags, .. }) | Some(Element::Way { tags, .. }) => Some(tags),
        None => None,
    }
}

fn attr_map(start: &BytesStart) -> Result<HashMap<String, String>, Error> {
    let mut out = HashMap::new();
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| Error::InvalidInput(format!("malformed XML attribute: {e}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = unescape_entities(&String::from_utf8_lossy(&attr.value));
        out.insert(key, value);
    }
    Ok(out)
}

// The corpus only ever emits the five predefined XML entities.
fn unescape_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="52.5" lon="13.4"/>
  <node id="2" lat="52.6" lon="13.5">
    <tag k="highway" v="crossing"/>
  </node>
  <way id="100">
    <nd ref="1"/>
    <nd ref="2"/>
    <tag k="highway" v="residential"/>
    <tag k="name" v="Foo &amp; Bar"/>
  </way>
  <relation id="7"><member type="way" ref="100" role=""/></relation>
</osm>
"#;

    #[test]
    fn parses_nodes_ways_and_tags() {
        let batch = elements_from_str(SAMPLE).unwrap();
        assert_eq!(batch.elements.len(), 3);

        match &batch.elements[2] {
            Element::Way { id, nodes, tags } => {
                assert_eq!(*id, 100);
                assert_eq!(nodes, &vec![1, 2]);
                assert_eq!(tags.get("highway").unwrap(), "residential");
                assert_eq!(tags.get("name").unwrap(), "Foo & Bar");
            }
            other => panic!("expected way, got {other:?}"),
        }
    }

    #[test]
    fn relations_are_ignored() {
        let batch = elements_from_str(SAMPLE).unwrap();
        assert!(batch.elements.iter().all(|e| matches!(
            e,
            Element::Node { .. } | Element::Way { .. }
        )));
    }
}
