//! Error types for the search E2E harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("session setup failed: {0}")]
    Setup(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {elapsed_ms} ms")]
    NavigationTimeout { url: String, elapsed_ms: u64 },

    #[error("no element matched '{selector}' within {timeout_ms} ms")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("element '{selector}' not interactable: {reason}")]
    ElementNotInteractable { selector: String, reason: String },

    #[error("address did not match '{pattern}' within {elapsed_ms} ms")]
    RedirectTimeout { pattern: String, elapsed_ms: u64 },

    #[error("unknown selector name: {0}")]
    UnknownSelector(String),

    #[error("node not found. Install Node.js and run: npm i playwright")]
    NodeNotFound,

    #[error("driver error: {0}")]
    Driver(String),

    #[error("unrecognized duration label: '{0}'")]
    DurationLabel(String),

    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("site unreachable: {url} after {attempts} attempt(s)")]
    SiteUnreachable { url: String, attempts: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

pub type E2eResult<T> = Result<T, E2eError>;
