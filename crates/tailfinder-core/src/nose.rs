use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// American reports its own fleet designator to BTS instead of the FAA
/// registration: `N` + fleet code + `AA`, e.g. `N3BDAA` for fleet `3BD`.
/// Anchored at both ends, so `N3BDAA1` is a registration, not a nose number.
const NOSE_NUMBER_PATTERN: &str = r"^N([0-9][0-9A-Z]{2})AA$";

/// What a value from the tail number column turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TailKind {
    /// Use as is.
    Registration,
    /// Needs translating through the registry.
    NoseNumber { fleet_code: String },
}

pub fn classify(tail: &str) -> TailKind {
    static NOSE_RE: OnceLock<Regex> = OnceLock::new();
    let re = NOSE_RE.get_or_init(|| Regex::new(NOSE_NUMBER_PATTERN).unwrap());

    match re.captures(tail.trim()) {
        Some(caps) => TailKind::NoseNumber {
            fleet_code: caps[1].to_string(),
        },
        None => TailKind::Registration,
    }
}

pub fn fleet_code(tail: &str) -> Option<String> {
    match classify(tail) {
        TailKind::NoseNumber { fleet_code } => Some(fleet_code),
        TailKind::Registration => None,
    }
}
