pub mod config;
pub mod departures;
pub mod finder;
pub mod form;
pub mod lookup;
pub mod nose;
pub mod query;
pub mod registry;
pub mod table;

pub use config::{DeparturesConfig, RegistryConfig, ResponseFormat, TailFinderConfig};
pub use finder::{TailFinder, TailLookup};
pub use lookup::MatchPolicy;
pub use query::FlightQuery;
pub use table::ResultsTable;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TailFinderError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Flight number {flight_number} not found in departures")]
    NotFound { flight_number: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TailFinderError {
    /// True for every failure that originates on the far side of the wire:
    /// transport errors as well as pages missing the elements we need.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            TailFinderError::UpstreamUnavailable(_) | TailFinderError::Network(_)
        )
    }
}

pub type Result<T, E = TailFinderError> = std::result::Result<T, E>;

/// Looks up the tail number for `flight` (e.g. `"AA1234"`) departing `origin`
/// on `date` (`MMDDYYYY`) using the default configuration.
///
/// A flight missing from the day's departures is reported as
/// [`TailFinderError::NotFound`].
pub fn get_tail_number(flight: &str, origin: &str, date: &str) -> Result<String> {
    let query = FlightQuery::parse(flight, origin, date)?;
    let finder = TailFinder::from_config(&TailFinderConfig::default())?;
    finder.lookup(&query)?.into_tail()
}
