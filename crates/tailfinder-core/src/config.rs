use crate::lookup::MatchPolicy;
use crate::{Result, TailFinderError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEPARTURES_URL: &str = "https://www.transtats.bts.gov/ONTIME/Departures.aspx";
pub const DEFAULT_REGISTRY_URL: &str = "http://rzjets.net/aircraft/index.php";
pub const DEFAULT_RESULTS_TABLE_ID: &str = "GridView1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/52.0.2743.116 Safari/537.36";

/// Shape of the departures portal's answer to the form POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseFormat {
    /// HTML page with the results in `table#<results_table_id>`.
    #[default]
    Html,
    /// Comma-delimited export text.
    Delimited,
}

impl std::str::FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(ResponseFormat::Html),
            "delimited" | "csv" => Ok(ResponseFormat::Delimited),
            other => Err(format!("unknown response format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeparturesConfig {
    pub url: String,
    pub user_agent: String,
    /// Per request. `None` waits forever.
    pub timeout_secs: Option<u64>,
    pub response_format: ResponseFormat,
    pub match_policy: MatchPolicy,
    pub results_table_id: String,
    pub use_system_proxy: bool,
}

impl Default for DeparturesConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DEPARTURES_URL.to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            response_format: ResponseFormat::Html,
            match_policy: MatchPolicy::ZeroPadded,
            results_table_id: DEFAULT_RESULTS_TABLE_ID.to_string(),
            use_system_proxy: true,
        }
    }
}

impl DeparturesConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
    pub user_agent: String,
    /// Sent verbatim as the `Cookie` header, e.g. `PHPSESSID=...`. When unset
    /// the client opens a fresh session by loading the search page first.
    pub session_cookie: Option<String>,
    /// Defaults to the search page URL.
    pub referer: Option<String>,
    pub timeout_secs: Option<u64>,
    pub use_system_proxy: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            session_cookie: None,
            referer: None,
            timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
            use_system_proxy: true,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailFinderConfig {
    pub departures: DeparturesConfig,
    pub registry: RegistryConfig,
}

impl TailFinderConfig {
    /// Per-user config file, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "tailfinder", "tailfinder")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Loads `path` if given (it must exist), else the per-user file if
    /// present, else the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_file(path);
        }

        match Self::default_path() {
            Some(p) if p.exists() => Self::load_file(&p),
            _ => {
                log::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        log::debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let config: TailFinderConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, raw) in [
            ("departures.url", &self.departures.url),
            ("registry.url", &self.registry.url),
        ] {
            let parsed = url::Url::parse(raw)
                .map_err(|e| TailFinderError::Config(format!("{} '{}': {}", name, raw, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(TailFinderError::Config(format!(
                    "{} must be http or https, got '{}'",
                    name,
                    parsed.scheme()
                )));
            }
        }

        let id = &self.departures.results_table_id;
        if id.is_empty()
            || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            || scraper::Selector::parse(&format!("table#{}", id)).is_err()
        {
            return Err(TailFinderError::Config(format!(
                "departures.results_table_id '{}' is not a plain element id",
                id
            )));
        }

        if let Some(cookie) = &self.registry.session_cookie {
            if cookie.trim().is_empty() || cookie.contains(['\r', '\n']) {
                return Err(TailFinderError::Config(
                    "registry.session_cookie must be a single non-empty header value".to_string(),
                ));
            }
        }
        Ok(())
    }
}
