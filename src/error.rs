use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Fetcher returned no nodes and no ways")]
    EmptyResponse,
    #[error("Graph has already been simplified")]
    AlreadySimplified,
    #[error("Path tracing exceeded the step limit; graph is malformed or too complex")]
    GraphTooComplex,
    #[error("No path from {origin} to {destination}")]
    NoPath { origin: i64, destination: i64 },
    #[error("Geocoder miss: {0}")]
    GeocodeMiss(String),
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    #[error("Fetcher failure: {0}")]
    FetcherFailure(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(String),
}
