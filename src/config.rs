use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use log::LevelFilter;

use crate::error::{Result, ScraperError};
use crate::logger;

pub const DEFAULT_JBOARD_URL: &str = "https://app.jboard.io/api/jobs";

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub search_engine_id: String,
    pub max_results: usize,
    pub job_sites: Vec<String>,
    pub locations: Vec<String>,
    pub job_roles: Vec<String>,
    pub expand_roles: bool,
    pub split_locations: bool,
    pub required_terms: Vec<String>,
    pub excluded_phrases: Vec<String>,
    pub fetch_descriptions: bool,
    pub url_shape_filter: bool,
    pub page_delay: Duration,
    pub sink_path: PathBuf,
    pub seed_links_file: Option<PathBuf>,
    pub json_snapshot: Option<PathBuf>,
    pub sink_batch_size: usize,
    pub sink_batch_pause: Duration,
    pub log_level: LevelFilter,
}

/// Settings for re-publishing stored records to the job board.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub jboard_api_key: String,
    pub jboard_url: String,
    pub category_id: u64,
    pub employers_file: PathBuf,
    pub sink_path: PathBuf,
    pub log_level: LevelFilter,
}

fn required<F>(lookup: &F, key: &'static str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ScraperError::MissingConfig(key))
}

fn parsed<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .map_err(|_| ScraperError::InvalidConfig { key, value }),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        None | Some("") => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ScraperError::InvalidConfig { key, value: other.to_string() }),
    }
}

/// Comma-separated list with blanks dropped.
fn list<F>(lookup: &F, key: &str) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn path<F>(lookup: &F, key: &str) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn millis<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    parsed(lookup, key, default).map(Duration::from_millis)
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Config {
            google_api_key: required(&lookup, "GOOGLE_API_KEY")?,
            search_engine_id: required(&lookup, "GOOGLE_SEARCH_ENGINE_ID")?,
            max_results: parsed(&lookup, "MAX_RESULTS", 400)?,
            job_sites: list(&lookup, "JOB_SITES"),
            locations: list(&lookup, "LOCATIONS"),
            job_roles: list(&lookup, "JOB_ROLES"),
            expand_roles: flag(&lookup, "EXPAND_ROLES", false)?,
            split_locations: flag(&lookup, "SPLIT_LOCATIONS", false)?,
            required_terms: list(&lookup, "REQUIRED_TERMS"),
            excluded_phrases: list(&lookup, "EXCLUDED_PHRASES"),
            fetch_descriptions: flag(&lookup, "FETCH_DESCRIPTIONS", true)?,
            url_shape_filter: flag(&lookup, "URL_SHAPE_FILTER", false)?,
            page_delay: millis(&lookup, "PAGE_DELAY_MS", 1000)?,
            sink_path: path(&lookup, "SINK_PATH")
                .unwrap_or_else(|| PathBuf::from("job_listings.csv")),
            seed_links_file: path(&lookup, "SEED_LINKS_FILE"),
            json_snapshot: path(&lookup, "JSON_SNAPSHOT"),
            sink_batch_size: parsed(&lookup, "SINK_BATCH_SIZE", 10)?,
            sink_batch_pause: millis(&lookup, "SINK_BATCH_PAUSE_MS", 500)?,
            log_level: logger::parse_level(lookup("LOG_LEVEL").as_deref()),
        })
    }
}

impl PublisherConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(PublisherConfig {
            jboard_api_key: required(&lookup, "JBOARD_API_KEY")?,
            jboard_url: lookup("JBOARD_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_JBOARD_URL.to_string()),
            category_id: parsed(&lookup, "JBOARD_CATEGORY_ID", 151223)?,
            employers_file: path(&lookup, "EMPLOYERS_FILE")
                .unwrap_or_else(|| PathBuf::from("employers.json")),
            sink_path: path(&lookup, "SINK_PATH")
                .unwrap_or_else(|| PathBuf::from("job_listings.csv")),
            log_level: logger::parse_level(lookup("LOG_LEVEL").as_deref()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_and_lists() {
        let config = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "key"),
            ("GOOGLE_SEARCH_ENGINE_ID", "cx"),
            ("JOB_SITES", "lever.co, ,greenhouse.io"),
            ("JOB_ROLES", "engineer,developer"),
            ("EXPAND_ROLES", "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.max_results, 400);
        assert_eq!(config.job_sites, vec!["lever.co", "greenhouse.io"]);
        assert!(config.locations.is_empty());
        assert!(config.expand_roles);
        assert!(config.fetch_descriptions);
        assert!(!config.url_shape_filter);
        assert_eq!(config.page_delay, Duration::from_secs(1));
        assert_eq!(config.sink_path, PathBuf::from("job_listings.csv"));
        assert_eq!(config.sink_batch_size, 10);
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let err = Config::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "key")])).unwrap_err();
        assert!(matches!(err, ScraperError::MissingConfig("GOOGLE_SEARCH_ENGINE_ID")));
    }

    #[test]
    fn test_bad_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("GOOGLE_API_KEY", "key"),
            ("GOOGLE_SEARCH_ENGINE_ID", "cx"),
            ("MAX_RESULTS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ScraperError::InvalidConfig { key: "MAX_RESULTS", .. }));
    }

    #[test]
    fn test_publisher_config() {
        let config =
            PublisherConfig::from_lookup(lookup_from(&[("JBOARD_API_KEY", "secret")])).unwrap();
        assert_eq!(config.jboard_url, DEFAULT_JBOARD_URL);
        assert_eq!(config.category_id, 151223);
        assert_eq!(config.employers_file, PathBuf::from("employers.json"));
    }
}
