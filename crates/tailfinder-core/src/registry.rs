//! Fleet code to registration lookups against the RZJets aircraft database.

use crate::config::RegistryConfig;
use crate::form::encode_pairs;
use crate::table::cell_text;
use crate::{Result, TailFinderError};
use log::{debug, info};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER};
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Rows before the first aircraft in the search results page.
const RESULT_HEADER_ROWS: usize = 3;

pub trait RegistrySource {
    fn registration_for_fleet(&self, fleet_code: &str) -> Result<String>;
}

pub struct RegistryClient {
    config: RegistryConfig,
}

impl RegistryClient {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// A client with an empty cookie jar, scoped to one search.
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

    /// Loads the search page so the server hands out a session cookie.
    fn open_session(&self, http: &Client) -> Result<()> {
        debug!("Opening registry session — url={}", self.config.url);
        http.get(&self.config.url).send()?.error_for_status()?;
        Ok(())
    }

    fn origin_header(&self) -> Option<String> {
        let origin = url::Url::parse(&self.config.url).ok()?.origin();
        origin.is_tuple().then(|| origin.ascii_serialization())
    }
}

impl RegistrySource for RegistryClient {
    fn registration_for_fleet(&self, fleet_code: &str) -> Result<String> {
        let fleet_code = fleet_code.trim();
        if fleet_code.len() != 3 || !fleet_code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TailFinderError::MalformedInput(format!(
                "fleet code '{}' must be three letters or digits",
                fleet_code
            )));
        }

        let http = self.session()?;
        if self.config.session_cookie.is_none() {
            self.open_session(&http)?;
        }

        let body = encode_pairs(search_fields(fleet_code));
        let referer = self
            .config
            .referer
            .clone()
            .unwrap_or_else(|| self.config.url.clone());

        let mut request = http
            .post(&self.config.url)
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(REFERER, referer);
        if let Some(origin) = self.origin_header() {
            request = request.header(ORIGIN, origin);
        }
        if let Some(cookie) = &self.config.session_cookie {
            request = request.header(COOKIE, cookie.as_str());
        }

        debug!(
            "Searching registry — url={} fleet={} body_bytes={}",
            self.config.url,
            fleet_code,
            body.len()
        );
        let page = request.body(body).send()?.error_for_status()?.text()?;

        let registration = parse_registration(&page)?;
        info!("Fleet {} resolved to {}", fleet_code, registration);
        Ok(registration)
    }
}

/// Search form with only the fleet filter set.
fn search_fields(fleet_code: &str) -> [(&'static str, &str); 11] {
    [
        ("registry", ""),
        ("searchMsn", ""),
        ("searchTyp", ""),
        ("searchSelcal", ""),
        ("fleet", fleet_code),
        ("opid1", ""),
        ("company1", ""),
        ("built", ""),
        ("searchNte", ""),
        ("frstatus", "any"),
        ("submitB", "search"),
    ]
}

/// First link text in the first aircraft row of a search results page.
pub fn parse_registration(page: &str) -> Result<String> {
    static TR_SEL: OnceLock<Selector> = OnceLock::new();
    static A_SEL: OnceLock<Selector> = OnceLock::new();
    let tr_sel = TR_SEL.get_or_init(|| Selector::parse("tr").unwrap());
    let a_sel = A_SEL.get_or_init(|| Selector::parse("a").unwrap());

    let html = Html::parse_document(page);
    let row = html.select(tr_sel).nth(RESULT_HEADER_ROWS).ok_or_else(|| {
        TailFinderError::UpstreamUnavailable("registry returned no matching aircraft".to_string())
    })?;
    let link = row.select(a_sel).next().ok_or_else(|| {
        TailFinderError::UpstreamUnavailable(
            "registry result row has no registration link".to_string(),
        )
    })?;

    let registration = cell_text(link);
    if registration.is_empty() {
        return Err(TailFinderError::UpstreamUnavailable(
            "registry result row has an empty registration".to_string(),
        ));
    }
    Ok(registration)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_page(rows: &[&str]) -> String {
        let mut page = String::from(
            "<html><body><table>\
             <tr><td>RZJets</td></tr>\
             <tr><td>Search results</td></tr>\
             <tr><th>Reg</th><th>Type</th><th>Fleet</th></tr>",
        );
        for row in rows {
            page.push_str(row);
        }
        page.push_str("</table></body></html>");
        page
    }

    #[test]
    fn test_first_aircraft_row() {
        let page = results_page(&[
            r##"<tr><td><a href="/aircraft/n917nn">N917NN</a></td><td>B738</td><td><a href="#">3BD</a></td></tr>"##,
            r#"<tr><td><a href="/aircraft/n918nn">N918NN</a></td><td>B738</td><td>3BE</td></tr>"#,
        ]);
        assert_eq!(parse_registration(&page).unwrap(), "N917NN");
    }

    #[test]
    fn test_no_results() {
        let page = results_page(&[]);
        assert!(matches!(
            parse_registration(&page),
            Err(TailFinderError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn test_row_without_link() {
        let page = results_page(&["<tr><td>No aircraft found</td></tr>"]);
        assert!(matches!(
            parse_registration(&page),
            Err(TailFinderError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn test_search_fields_only_filter_fleet() {
        let fields = search_fields("3BD");
        let set: Vec<_> = fields.iter().filter(|(_, v)| !v.is_empty()).collect();
        assert_eq!(
            set,
            [&("fleet", "3BD"), &("frstatus", "any"), &("submitB", "search")]
        );
        assert_eq!(
            encode_pairs(fields),
            "registry=&searchMsn=&searchTyp=&searchSelcal=&fleet=3BD&opid1=&company1=&built=&searchNte=&frstatus=any&submitB=search"
        );
    }

    #[test]
    fn test_rejects_bad_fleet_code_before_network() {
        let client = RegistryClient::new(RegistryConfig {
            url: "http://127.0.0.1:9/aircraft/index.php".to_string(),
            use_system_proxy: false,
            ..RegistryConfig::default()
        });
        assert!(matches!(
            client.registration_for_fleet("3B"),
            Err(TailFinderError::MalformedInput(_))
        ));
    }
}
