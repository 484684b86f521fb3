use crate::table::ResultsTable;
use serde::{Deserialize, Serialize};

pub const FLIGHT_NUMBER_COLUMN: &str = "Flight Number";
pub const TAIL_NUMBER_COLUMN: &str = "Tail Number";

/// How a queried flight number is compared with the report's column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Trimmed strings must be identical.
    Exact,
    /// Both sides are left-padded with zeros to four digits first, so the
    /// portal's `0100` matches a query for `100`.
    #[default]
    ZeroPadded,
}

impl MatchPolicy {
    pub fn matches(self, cell: &str, flight_number: &str) -> bool {
        let cell = cell.trim();
        let flight_number = flight_number.trim();
        match self {
            MatchPolicy::Exact => cell == flight_number,
            MatchPolicy::ZeroPadded => {
                !cell.is_empty() && pad4(cell) == pad4(flight_number)
            }
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchPolicy::Exact),
            "zero-padded" | "padded" => Ok(MatchPolicy::ZeroPadded),
            other => Err(format!("unknown match policy '{}'", other)),
        }
    }
}

fn pad4(s: &str) -> String {
    format!("{:0>4}", s)
}

/// Tail field of the first row whose flight number matches, trimmed.
/// A blank tail cell counts as no match.
pub fn find_tail(table: &ResultsTable, flight_number: &str, policy: MatchPolicy) -> Option<String> {
    let row = table.rows().find(|row| {
        row.get(FLIGHT_NUMBER_COLUMN)
            .is_some_and(|cell| policy.matches(cell, flight_number))
    })?;

    let tail = row.get(TAIL_NUMBER_COLUMN)?.trim();
    if tail.is_empty() {
        log::debug!("Flight {} present but tail number is blank", flight_number);
        return None;
    }
    Some(tail.to_string())
}
