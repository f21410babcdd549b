use thiserror::Error;

/// Errors surfaced by the search pipeline and its collaborators.
///
/// HTTP status codes are never errors here: throttled and failed responses
/// come back as plain `HttpResponse`s for the caller to inspect.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("invalid HTTP method: {0} (expected one of get, post, patch, put)")]
    InvalidMethod(String),

    #[error("missing required setting: {0}")]
    MissingConfig(&'static str),

    #[error("invalid value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
