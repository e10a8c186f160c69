use fieldcheck_common::EntryId;
use fieldcheck_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckError>;

/// Failure kinds surfaced to the HTTP boundary. An empty selection is not an error.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("upstream feed error: {0}")]
    Upstream(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("this location is already checked")]
    AlreadyResolved(EntryId),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<StoreError> for CheckError {
    fn from(err: StoreError) -> Self {
        CheckError::Persistence(err.to_string())
    }
}

impl From<feed_client::FeedError> for CheckError {
    fn from(err: feed_client::FeedError) -> Self {
        match err {
            feed_client::FeedError::NotFound(id) => {
                CheckError::NotFound(format!("feed entry {id}"))
            }
            other => CheckError::Upstream(other.to_string()),
        }
    }
}
