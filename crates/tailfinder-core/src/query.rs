use crate::{Result, TailFinderError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One departure to look up: who flew it, from where and on which day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightQuery {
    pub carrier: String,
    pub flight_number: String,
    pub origin: String,
    pub date: NaiveDate,
}

impl FlightQuery {
    pub fn new(
        carrier: &str,
        flight_number: &str,
        origin: &str,
        date: NaiveDate,
    ) -> Result<Self> {
        let carrier = parse_carrier(carrier)?;
        let flight_number = parse_flight_number(flight_number)?;
        let origin = parse_origin(origin)?;
        Ok(Self {
            carrier,
            flight_number,
            origin,
            date,
        })
    }

    /// Builds a query from a flight identifier such as `"AA1234"`, an origin
    /// airport code and a `MMDDYYYY` date string.
    pub fn parse(flight: &str, origin: &str, date: &str) -> Result<Self> {
        let (carrier, number) = split_flight_ident(flight)?;
        Self::new(carrier, number, origin, parse_mmddyyyy(date)?)
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

impl std::fmt::Display for FlightQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} from {} on {}",
            self.carrier,
            self.flight_number,
            self.origin,
            self.date.format("%Y-%m-%d")
        )
    }
}

/// Splits `"AA1234"` into the two-character carrier code and the digits.
pub fn split_flight_ident(flight: &str) -> Result<(&str, &str)> {
    let flight = flight.trim();
    if flight.len() < 3 || !flight.is_char_boundary(2) {
        return Err(TailFinderError::MalformedInput(format!(
            "flight identifier '{}' must be a carrier code followed by a flight number",
            flight
        )));
    }
    Ok(flight.split_at(2))
}

/// Parses an 8-character `MMDDYYYY` date.
pub fn parse_mmddyyyy(date: &str) -> Result<NaiveDate> {
    let date = date.trim();
    if date.len() != 8 || !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(TailFinderError::MalformedInput(format!(
            "date '{}' must be 8 digits in MMDDYYYY form",
            date
        )));
    }
    NaiveDate::parse_from_str(date, "%m%d%Y").map_err(|e| {
        TailFinderError::MalformedInput(format!("date '{}' is not a calendar date: {}", date, e))
    })
}

fn parse_carrier(carrier: &str) -> Result<String> {
    let carrier = carrier.trim();
    // IATA designators are two characters and may contain a digit (B6, 9E).
    if carrier.len() != 2 || !carrier.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(TailFinderError::MalformedInput(format!(
            "carrier code '{}' must be two letters or digits",
            carrier
        )));
    }
    Ok(carrier.to_ascii_uppercase())
}

fn parse_flight_number(number: &str) -> Result<String> {
    let number = number.trim();
    if number.is_empty() || number.len() > 4 || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(TailFinderError::MalformedInput(format!(
            "flight number '{}' must be 1 to 4 digits",
            number
        )));
    }
    Ok(number.to_string())
}

fn parse_origin(origin: &str) -> Result<String> {
    let origin = origin.trim();
    if origin.len() != 3 || !origin.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(TailFinderError::MalformedInput(format!(
            "origin '{}' must be a three-letter airport code",
            origin
        )));
    }
    Ok(origin.to_ascii_uppercase())
}
