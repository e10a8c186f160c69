use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fieldcheck_core::CheckError;
use fieldcheck_store::StoreError;
use tracing::{error, warn};

/// Handler error. Converts to a plain-text response and logs exactly once.
#[derive(Debug)]
pub struct ApiError(pub CheckError);

impl From<CheckError> for ApiError {
    fn from(err: CheckError) -> Self {
        Self(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(CheckError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            CheckError::Upstream(msg) => {
                warn!(error = %msg, "Upstream feed request failed");
                (StatusCode::BAD_GATEWAY, "upstream feed unavailable".to_string())
            }
            CheckError::Persistence(msg) => {
                error!(error = %msg, "Persistence failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            CheckError::AlreadyResolved(entry_id) => {
                warn!(entry_id, "Rejected resolve of already checked entry");
                (StatusCode::CONFLICT, self.0.to_string())
            }
            CheckError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            CheckError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };
        (status, body).into_response()
    }
}
