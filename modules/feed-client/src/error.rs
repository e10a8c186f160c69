use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Feed entry not found: {0}")]
    NotFound(i64),
}

impl FeedError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Network(_) => true,
            FeedError::Api { status, .. } => *status == 429 || *status >= 500,
            FeedError::Parse(_) | FeedError::NotFound(_) => false,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FeedError::Parse(err.to_string())
        } else {
            FeedError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Parse(err.to_string())
    }
}
