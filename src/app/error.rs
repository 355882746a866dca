use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unexpected page markup at {url}: {reason}")]
    SourceFormat { url: String, reason: String },

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Timed out after {secs}s waiting for {url} to pass verification")]
    EvasionTimeout { url: String, secs: u64 },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("AI upstream error: {0}")]
    UpstreamAnalysis(String),

    #[error("Could not extract JSON from model response: {0}")]
    Extraction(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ScoutError {
    pub fn source_format(url: &str, reason: impl Into<String>) -> Self {
        Self::SourceFormat {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the failed unit of work may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SourceFormat { .. }
                | Self::Fetch(_)
                | Self::EvasionTimeout { .. }
                | Self::Browser(_)
                | Self::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
