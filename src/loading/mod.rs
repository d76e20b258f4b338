//! This module is responsible for loading raw map elements (fetcher
//! responses, local map-XML files) and building the street graph from them.

mod builder;
mod config;
pub mod osm;

pub use builder::{BuildOptions, graph_from_elements, graph_from_xml};
pub use config::Settings;

use geo::Polygon;

use crate::Error;
use crate::loading::osm::ElementBatch;

/// Contract of the map element fetcher collaborator.
///
/// Batches arrive in order and each is fully parsed before the next is
/// requested; failure of any batch aborts the build. The core neither
/// retries nor masks fetcher failures.
pub trait ElementFetcher {
    fn fetch(
        &mut self,
        polygon: &Polygon<f64>,
        network_type: &str,
    ) -> Result<Vec<ElementBatch>, Error>;
}

/// Contract of the gazetteer collaborator: place name to `(lat, lon)`.
pub trait Geocoder {
    fn geocode(&self, query: &str) -> Result<(f64, f64), Error>;
}

/// Contract of the coordinate projection collaborator.
pub trait Projector {
    fn project(
        &self,
        from_crs: &str,
        to_crs: &str,
        xy: (f64, f64),
    ) -> Result<(f64, f64), Error>;
}
