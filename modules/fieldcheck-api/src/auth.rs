use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use fieldcheck_common::{PermLevel, User};
use tracing::warn;

use crate::AppState;

pub const AUTH_HEADER: &str = "Auth-Key";

/// Value of the `Auth-Key` header, if present and non-empty.
pub fn auth_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// A user at moderator level or above. Extract this in admin handlers.
pub struct Moderator(pub User);

impl FromRequestParts<Arc<AppState>> for Moderator {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let unauthorized = |msg: &'static str| (StatusCode::UNAUTHORIZED, msg).into_response();

        let Some(key) = auth_key(&parts.headers) else {
            return Err(unauthorized("User not found."));
        };

        let user = match state.users.user_by_auth_key(key).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(unauthorized("User not found.")),
            Err(e) => {
                warn!(error = %e, "User lookup failed");
                return Err(unauthorized("User not found."));
            }
        };

        if user.perm_level < PermLevel::Moderator {
            return Err(unauthorized("You are not allowed to access here."));
        }
        Ok(Moderator(user))
    }
}
