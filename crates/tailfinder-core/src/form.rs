//! Field layout of the BTS departures statistics form.
//!
//! The portal is an ASP.NET WebForms page: every checkbox is named
//! `<group>$<index>` and the index is the only thing that identifies which
//! month, day or year is selected. [`DeparturesForm`] owns that naming
//! scheme so callers only deal in dates.

use crate::query::FlightQuery;
use crate::{Result, TailFinderError};
use serde::{Deserialize, Serialize};

/// First year offered by the portal's year checkboxes (`chkYears$0`).
pub const BASE_YEAR: i32 = 1987;

/// Postback target that asks the portal for the export of the selection.
const EVENT_TARGET: &str = "DL_CSV";

/// Hidden WebForms state that must be echoed back on every postback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormTokens {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

/// Statistic columns requested alongside the default report columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    ActualDepartureTime = 1,
    ActualElapsedTime = 3,
}

impl Statistic {
    fn index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeparturesForm {
    tokens: FormTokens,
    statistics: Vec<Statistic>,
    month: u32,
    day: u32,
    year: i32,
    origin: String,
    carrier: String,
}

impl DeparturesForm {
    pub fn new(query: &FlightQuery, tokens: FormTokens) -> Result<Self> {
        let year = query.year();
        if year < BASE_YEAR {
            return Err(TailFinderError::MalformedInput(format!(
                "departures data starts in {}, got {}",
                BASE_YEAR, year
            )));
        }

        Ok(Self {
            tokens,
            statistics: vec![
                Statistic::ActualDepartureTime,
                Statistic::ActualElapsedTime,
            ],
            month: query.month(),
            day: query.day(),
            year,
            origin: query.origin.clone(),
            carrier: query.carrier.clone(),
        })
    }

    /// The exact name/value pairs the portal expects, in submission order.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("__EVENTTARGET".to_string(), EVENT_TARGET.to_string()),
            ("__EVENTARGUMENT".to_string(), String::new()),
            ("__VIEWSTATE".to_string(), self.tokens.view_state.clone()),
            (
                "__VIEWSTATEGENERATOR".to_string(),
                self.tokens.view_state_generator.clone(),
            ),
            (
                "__EVENTVALIDATION".to_string(),
                self.tokens.event_validation.clone(),
            ),
        ];

        for stat in &self.statistics {
            fields.push((
                format!("chkStatistics${}", stat.index()),
                stat.index().to_string(),
            ));
        }

        fields.push((format!("chkMonths${}", self.month - 1), self.month.to_string()));
        fields.push((format!("chkDays${}", self.day - 1), self.day.to_string()));
        fields.push((
            format!("chkYears${}", self.year - BASE_YEAR),
            self.year.to_string(),
        ));
        fields.push(("cboAirport".to_string(), self.origin.clone()));
        fields.push(("cboAirline".to_string(), self.carrier.clone()));
        fields.push(("btnSubmit".to_string(), "Submit".to_string()));
        fields
    }

    /// `application/x-www-form-urlencoded` request body.
    pub fn encode(&self) -> String {
        encode_pairs(self.fields())
    }
}

pub(crate) fn encode_pairs<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
