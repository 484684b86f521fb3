use crate::config::TailFinderConfig;
use crate::departures::{DeparturesClient, DeparturesSource};
use crate::lookup::{find_tail, MatchPolicy};
use crate::nose::{classify, TailKind};
use crate::query::FlightQuery;
use crate::registry::{RegistryClient, RegistrySource};
use crate::{Result, TailFinderError};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TailLookup {
    /// The departures report carried a registration.
    Tail { tail: String },
    /// The report carried a nose number, translated through the registry.
    Resolved {
        nose: String,
        fleet_code: String,
        tail: String,
    },
    NotFound { flight_number: String },
}

impl TailLookup {
    pub fn tail(&self) -> Option<&str> {
        match self {
            TailLookup::Tail { tail } | TailLookup::Resolved { tail, .. } => Some(tail.as_str()),
            TailLookup::NotFound { .. } => None,
        }
    }

    pub fn into_tail(self) -> Result<String> {
        match self {
            TailLookup::Tail { tail } | TailLookup::Resolved { tail, .. } => Ok(tail),
            TailLookup::NotFound { flight_number } => {
                Err(TailFinderError::NotFound { flight_number })
            }
        }
    }
}

/// Drives a lookup: departures report, row match, and the registry hop for
/// nose numbers.
pub struct TailFinder<D = DeparturesClient, R = RegistryClient> {
    departures: D,
    registry: R,
    match_policy: MatchPolicy,
}

impl TailFinder {
    pub fn from_config(config: &TailFinderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            DeparturesClient::new(config.departures.clone()),
            RegistryClient::new(config.registry.clone()),
            config.departures.match_policy,
        ))
    }
}

impl<D: DeparturesSource, R: RegistrySource> TailFinder<D, R> {
    pub fn new(departures: D, registry: R, match_policy: MatchPolicy) -> Self {
        Self {
            departures,
            registry,
            match_policy,
        }
    }

    pub fn lookup(&self, query: &FlightQuery) -> Result<TailLookup> {
        debug!("Looking up {}", query);
        let table = self.departures.fetch_departures(query)?;

        let Some(value) = find_tail(&table, &query.flight_number, self.match_policy) else {
            info!("{} not in departures report ({} rows)", query, table.len());
            return Ok(TailLookup::NotFound {
                flight_number: query.flight_number.clone(),
            });
        };

        match classify(&value) {
            TailKind::Registration => {
                info!("{} flown by {}", query, value);
                Ok(TailLookup::Tail { tail: value })
            }
            TailKind::NoseNumber { fleet_code } => {
                debug!("{} reported nose number {} (fleet {})", query, value, fleet_code);
                let tail = self.registry.registration_for_fleet(&fleet_code)?;
                info!("{} flown by {} (nose {})", query, tail, value);
                Ok(TailLookup::Resolved {
                    nose: value,
                    fleet_code,
                    tail,
                })
            }
        }
    }

    /// Convenience wrapper: `"AA1234"`, `"DFW"`, `"07042016"`.
    pub fn get_tail_number(&self, flight: &str, origin: &str, date: &str) -> Result<String> {
        let query = FlightQuery::parse(flight, origin, date)?;
        self.lookup(&query)?.into_tail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ResultsTable;
    use std::cell::RefCell;

    struct StubDepartures {
        table: Option<ResultsTable>,
    }

    impl DeparturesSource for StubDepartures {
        fn fetch_departures(&self, _query: &FlightQuery) -> Result<ResultsTable> {
            self.table.clone().ok_or_else(|| {
                TailFinderError::UpstreamUnavailable("landing page has no tokens".to_string())
            })
        }
    }

    #[derive(Default)]
    struct StubRegistry {
        calls: RefCell<Vec<String>>,
    }

    impl RegistrySource for StubRegistry {
        fn registration_for_fleet(&self, fleet_code: &str) -> Result<String> {
            self.calls.borrow_mut().push(fleet_code.to_string());
            match fleet_code {
                "123" => Ok("N123XY".to_string()),
                _ => Err(TailFinderError::UpstreamUnavailable(
                    "registry returned no matching aircraft".to_string(),
                )),
            }
        }
    }

    fn finder(rows: &[(&str, &str)]) -> TailFinder<StubDepartures, StubRegistry> {
        let table = ResultsTable::new(
            vec!["Flight Number".to_string(), "Tail Number".to_string()],
            rows.iter()
                .map(|(f, t)| vec![f.to_string(), t.to_string()])
                .collect(),
        )
        .unwrap();
        TailFinder::new(
            StubDepartures { table: Some(table) },
            StubRegistry::default(),
            MatchPolicy::Exact,
        )
    }

    #[test]
    fn test_nose_number_resolved_through_registry() {
        let f = finder(&[("1234", "N123AA")]);
        let result = f.get_tail_number("AA1234", "DFW", "07042016").unwrap();
        assert_eq!(result, "N123XY");
        assert_eq!(*f.registry.calls.borrow(), vec!["123".to_string()]);

        let q = FlightQuery::parse("AA1234", "DFW", "07042016").unwrap();
        assert_eq!(
            f.lookup(&q).unwrap(),
            TailLookup::Resolved {
                nose: "N123AA".to_string(),
                fleet_code: "123".to_string(),
                tail: "N123XY".to_string(),
            }
        );
    }

    #[test]
    fn test_plain_tail_skips_registry() {
        let f = finder(&[("1234", "N987UA")]);
        assert_eq!(f.get_tail_number("UA1234", "ORD", "07042016").unwrap(), "N987UA");
        assert!(f.registry.calls.borrow().is_empty());
    }

    #[test]
    fn test_absent_flight_is_not_found() {
        let f = finder(&[("1234", "N987UA")]);
        let q = FlightQuery::parse("UA9999", "ORD", "07042016").unwrap();
        assert_eq!(
            f.lookup(&q).unwrap(),
            TailLookup::NotFound {
                flight_number: "9999".to_string()
            }
        );
        assert!(matches!(
            f.get_tail_number("UA9999", "ORD", "07042016"),
            Err(TailFinderError::NotFound { flight_number }) if flight_number == "9999"
        ));
    }

    #[test]
    fn test_upstream_failure_propagates() {
        let f = TailFinder::new(
            StubDepartures { table: None },
            StubRegistry::default(),
            MatchPolicy::ZeroPadded,
        );
        let err = f.get_tail_number("AA1", "DFW", "07042016").unwrap_err();
        assert!(matches!(err, TailFinderError::UpstreamUnavailable(_)));
        assert!(err.is_upstream());
    }

    #[test]
    fn test_registry_failure_propagates() {
        let f = finder(&[("1", "N3BDAA")]);
        let err = f.get_tail_number("AA1", "DFW", "07042016").unwrap_err();
        assert!(matches!(err, TailFinderError::UpstreamUnavailable(_)));
        assert_eq!(*f.registry.calls.borrow(), vec!["3BD".to_string()]);
    }

    #[test]
    fn test_unusual_values_returned_verbatim() {
        let f = finder(&[("88", "G-EUPT")]);
        assert_eq!(f.get_tail_number("BA88", "LHR", "07042016").unwrap(), "G-EUPT");
    }

    #[test]
    fn test_bad_identifier_never_reaches_upstream() {
        let f = TailFinder::new(
            StubDepartures { table: None },
            StubRegistry::default(),
            MatchPolicy::Exact,
        );
        let err = f.get_tail_number("A", "DFW", "07042016").unwrap_err();
        assert!(matches!(err, TailFinderError::MalformedInput(_)));
    }

    #[test]
    fn test_lookup_serializes_with_status_tag() {
        let json = serde_json::to_value(TailLookup::Tail {
            tail: "N987UA".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "tail");
        assert_eq!(json["tail"], "N987UA");
    }
}
