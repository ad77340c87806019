//! Bearer token authentication.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};
use erx_persistence::core::Storage;
use erx_persistence::types::{RecordId, Role, User};
use tracing::debug;

use crate::error::RestError;
use crate::state::AppState;

/// The authenticated caller.
///
/// The user is reloaded from storage on every request, so role changes and
/// deletions take effect without waiting for the token to expire.
///
/// # Example
///
/// ```rust,ignore
/// use erx_rest::extractors::AuthUser;
///
/// async fn handler(caller: AuthUser) -> String {
///     format!("Hello, {}", caller.user.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The caller's account.
    pub user: User,
}

impl AuthUser {
    /// The caller's id.
    pub fn id(&self) -> &RecordId {
        &self.user.id
    }

    /// The caller's role.
    pub fn role(&self) -> Role {
        self.user.role
    }
}

/// Extracts the token from an `Authorization: Bearer` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
    S: Storage,
{
    type Rejection = RestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| RestError::unauthorized("No token provided"))?;

        let id = state.tokens().verify(token).map_err(|e| {
            debug!(error = %e, "Rejected access token");
            RestError::unauthorized("Invalid or expired token")
        })?;

        let user = state
            .storage()
            .find_user(&id)
            .await?
            .ok_or_else(|| RestError::unauthorized("User no longer exists"))?;

        Ok(AuthUser { user })
    }
}
