//! Client for the BTS on-time "Detailed Statistics: Departures" portal.

use crate::config::{DeparturesConfig, ResponseFormat};
use crate::form::{DeparturesForm, FormTokens};
use crate::query::FlightQuery;
use crate::table::ResultsTable;
use crate::{Result, TailFinderError};
use log::{debug, info, warn};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, REFERER};
use scraper::{Html, Selector};

/// Anything that can produce the day's departures report for a query.
pub trait DeparturesSource {
    fn fetch_departures(&self, query: &FlightQuery) -> Result<ResultsTable>;
}

pub struct DeparturesClient {
    config: DeparturesConfig,
}

impl DeparturesClient {
    pub fn new(config: DeparturesConfig) -> Self {
        Self { config }
    }

    /// A client with an empty cookie jar; the portal's ASP.NET session lives
    /// only as long as one `fetch_departures` call.
    fn session(&self) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(self.config.user_agent.clone())
            .cookie_store(true)
            .timeout(self.config.timeout());
        if !self.config.use_system_proxy {
            builder = builder.no_proxy();
        }
        Ok(builder.build()?)
    }

    fn fetch_tokens(&self, http: &Client) -> Result<FormTokens> {
        debug!("Fetching departures landing page — url={}", self.config.url);
        let page = http
            .get(&self.config.url)
            .send()?
            .error_for_status()?
            .text()?;
        extract_form_tokens(&page)
    }

    fn submit(&self, http: &Client, form: &DeparturesForm) -> Result<String> {
        let body = form.encode();
        debug!(
            "Posting departures form — url={} body_bytes={}",
            self.config.url,
            body.len()
        );
        let response = http
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REFERER, self.config.url.as_str())
            .body(body)
            .send()?
            .error_for_status()?;
        Ok(response.text()?)
    }

    fn parse_response(&self, body: &str) -> Result<ResultsTable> {
        match self.config.response_format {
            ResponseFormat::Delimited => ResultsTable::from_delimited(body),
            ResponseFormat::Html => {
                match ResultsTable::from_html(body, &self.config.results_table_id)? {
                    Some(table) => Ok(table),
                    None => {
                        warn!(
                            "Departures response has no table#{}; treating as no flights",
                            self.config.results_table_id
                        );
                        Ok(ResultsTable::default())
                    }
                }
            }
        }
    }
}

impl DeparturesSource for DeparturesClient {
    fn fetch_departures(&self, query: &FlightQuery) -> Result<ResultsTable> {
        let http = self.session()?;
        let tokens = self.fetch_tokens(&http)?;
        let form = DeparturesForm::new(query, tokens)?;
        let body = self.submit(&http, &form)?;
        let table = self.parse_response(&body)?;
        info!("Departures for {} — rows={}", query, table.len());
        Ok(table)
    }
}

/// Reads the three hidden WebForms inputs off the landing page.
pub fn extract_form_tokens(page: &str) -> Result<FormTokens> {
    let html = Html::parse_document(page);
    let mut missing = Vec::new();
    let mut hidden = |id: &str| -> String {
        let value = Selector::parse(&format!("input#{}", id))
            .ok()
            .and_then(|sel| {
                html.select(&sel)
                    .next()
                    .and_then(|el| el.value().attr("value"))
                    .map(|v| v.to_string())
            });
        value.unwrap_or_else(|| {
            missing.push(id.to_string());
            String::new()
        })
    };

    let tokens = FormTokens {
        view_state: hidden("__VIEWSTATE"),
        view_state_generator: hidden("__VIEWSTATEGENERATOR"),
        event_validation: hidden("__EVENTVALIDATION"),
    };

    if !missing.is_empty() {
        return Err(TailFinderError::UpstreamUnavailable(format!(
            "departures landing page is missing form tokens: {}",
            missing.join(", ")
        )));
    }
    Ok(tokens)
}
