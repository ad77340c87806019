//! Profile picture and prescription attachment uploads.
//!
//! Files are stored by an external upload service. These endpoints only accept
//! locations under the configured base URL; the profile endpoint also records
//! the picture on the caller's account.

use axum::{extract::State, response::Response};
use erx_persistence::core::Storage;
use erx_persistence::types::{AuditAction, AuditEntry, AuditResourceType, ProfileUpdate};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::auth::{PRESCRIBERS, require_role};
use crate::config::ServerConfig;
use crate::error::{RestError, RestResult};
use crate::extractors::{AuthUser, ClientInfo, JsonBody};
use crate::responses;
use crate::state::AppState;

/// Body of an upload request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UploadRequest {
    /// Location of the uploaded file.
    pub url: Option<String>,
}

/// Returns the parsed `candidate` if it is a well-formed URL under `base`.
pub fn within_base(base: &str, candidate: &str) -> Option<Url> {
    let base = Url::parse(base).ok()?;
    let candidate = Url::parse(candidate.trim()).ok()?;

    let same_origin = candidate.origin() == base.origin();
    let base_path = base.path().trim_end_matches('/');
    let under_path = candidate
        .path()
        .strip_prefix(base_path)
        .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1);

    (same_origin && under_path).then_some(candidate)
}

/// Checks an uploaded file's location against the configured upload base.
fn uploaded_location(config: &ServerConfig, body: UploadRequest) -> RestResult<Url> {
    let Some(base) = config.upload_base_url.as_deref() else {
        return Err(RestError::unavailable(
            "upload_not_configured",
            "File upload service is not configured",
        ));
    };

    let raw = body
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| RestError::bad_request("No file URL provided"))?;
    within_base(base, &raw)
        .ok_or_else(|| RestError::bad_request("File URL is not under the upload location"))
}

/// Records an uploaded profile picture.
///
/// # HTTP Request
///
/// `POST [base]/api/uploads/profile` with `{url}`
///
/// # Response
///
/// - `200 OK` - `{message, user, url}`
/// - `400 Bad Request` - missing URL or one outside the upload base
/// - `503 Service Unavailable` - no upload base configured
pub async fn upload_profile_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    JsonBody(body): JsonBody<UploadRequest>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(user = %caller.id(), "Processing profile picture upload");
    let url = uploaded_location(state.config(), body)?;

    let user = state
        .storage()
        .update_profile(
            caller.id(),
            ProfileUpdate {
                profile_picture: Some(url.to_string()),
                ..Default::default()
            },
        )
        .await?;

    state.audit().record(
        AuditEntry::new(
            AuditAction::ProfilePictureUploaded,
            AuditResourceType::User,
        )
        .by(&user.id)
        .on(user.id.as_str())
        .with_details(json!({ "url": url.as_str() }))
        .from_client(client.ip_address, client.user_agent),
    );

    Ok(responses::success(json!({
        "message": "Profile picture updated",
        "user": user,
        "url": url.as_str(),
    })))
}

/// Accepts a prescription attachment.
///
/// # HTTP Request
///
/// `POST [base]/api/uploads/prescription` with `{url}` (doctor or admin)
///
/// # Response
///
/// - `200 OK` - `{url}`
/// - `400 Bad Request` - missing URL or one outside the upload base
/// - `403 Forbidden` - caller may not write prescriptions
/// - `503 Service Unavailable` - no upload base configured
pub async fn upload_prescription_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    JsonBody(body): JsonBody<UploadRequest>,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), PRESCRIBERS)?;
    debug!(user = %caller.id(), "Processing prescription attachment upload");

    let url = uploaded_location(state.config(), body)?;
    Ok(responses::success(json!({ "url": url.as_str() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://cdn.example.com/erx/";

    #[test]
    fn test_accepts_files_under_base() {
        let url = within_base(BASE, "https://cdn.example.com/erx/avatars/1.png").unwrap();
        assert_eq!(url.path(), "/erx/avatars/1.png");
    }

    #[test]
    fn test_rejects_other_hosts_and_paths() {
        assert!(within_base(BASE, "https://evil.example.com/erx/1.png").is_none());
        assert!(within_base(BASE, "https://cdn.example.com/erxx/1.png").is_none());
        assert!(within_base(BASE, "https://cdn.example.com/erx/").is_none());
        assert!(within_base(BASE, "not a url").is_none());
    }
}
