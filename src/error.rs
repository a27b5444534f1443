//! Custom error types for lemmasearch

use thiserror::Error;

/// Main error type for lemmasearch operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Network failure, timeout or non-2xx response
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Malformed URL, blank content or a missing required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// A concurrent writer held the row; safe to retry
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed in the current lifecycle state
    #[error("Invalid state: {0}")]
    State(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Not initialized: run 'lemmasearch init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl Error {
    /// Whether the operation may succeed if simply attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Message safe to show at an outer boundary.
    ///
    /// Caller mistakes keep their precise wording, storage and internal
    /// failures collapse to a generic indicator.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation(msg) | Error::State(msg) | Error::NotFound(msg) => msg.clone(),
            Error::Fetch(msg) => format!("Failed to fetch page: {}", msg),
            _ => "Internal error".to_string(),
        }
    }
}

/// Result type alias for lemmasearch
pub type Result<T> = std::result::Result<T, Error>;
