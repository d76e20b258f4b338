//! Raw map elements as delivered by the fetcher or a local map-XML file.

pub mod xml;

use hashbrown::HashMap;

use crate::model::OsmId;

/// A single raw element. Relations are out of scope and never represented.
#[derive(Debug, Clone)]
pub enum Element {
    Node {
        id: OsmId,
        lat: f64,
        lon: f64,
        tags: HashMap<String, String>,
    },
    Way {
        id: OsmId,
        nodes: Vec<OsmId>,
        tags: HashMap<String, String>,
    },
}

/// One fetcher response batch.
#[derive(Debug, Clone, Default)]
pub struct ElementBatch {
    pub elements: Vec<Element>,
}

impl ElementBatch {
    pub fn new(elements: Vec<Element>) -> Self {
        Self { elements }
    }
}
