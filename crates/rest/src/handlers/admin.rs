//! Administrative handlers: user management and the audit trail.
//!
//! Every route requires the admin role. Admins cannot change their own role
//! or delete themselves.

use axum::{
    extract::{Path, State},
    response::Response,
};
use erx_persistence::core::Storage;
use erx_persistence::types::{
    AuditAction, AuditEntry, AuditQuery, AuditResourceType, RecordId, Role, UserQuery,
    parse_date_bound,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::auth::{ADMINS, require_role};
use crate::error::{RestError, RestResult};
use crate::extractors::{AuthUser, ClientInfo, JsonBody, QueryParams};
use crate::responses;
use crate::state::AppState;

/// Default page size for the user listing.
pub const DEFAULT_USER_PAGE_SIZE: usize = 20;

/// Upper bound on `limit` for admin listings.
pub const MAX_ADMIN_PAGE_SIZE: usize = 100;

/// Body of a role change request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoleRequest {
    /// New role name.
    pub role: Option<String>,
}

fn user_not_found() -> RestError {
    RestError::not_found("User not found")
}

fn date_param(params: &QueryParams, name: &str) -> RestResult<Option<chrono::DateTime<chrono::Utc>>> {
    params
        .get(name)
        .map(parse_date_bound)
        .transpose()
        .map_err(|_| RestError::bad_request("Invalid date"))
}

/// Lists accounts with offset paging.
///
/// # HTTP Request
///
/// `GET [base]/api/admin/users?page&limit&search&role`
///
/// # Response
///
/// `{success, data, pagination: {total, page, pages, limit}}`
pub async fn list_users_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    params: QueryParams,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), ADMINS)?;

    let role = params
        .get("role")
        .map(str::parse::<Role>)
        .transpose()?;
    let query = UserQuery {
        search: params.text("search"),
        role,
        page: params.page(),
        limit: params.limit(DEFAULT_USER_PAGE_SIZE, MAX_ADMIN_PAGE_SIZE),
    };
    debug!(page = query.page, limit = query.limit, "Processing user listing");

    let page = state.storage().list_users(&query).await?;
    Ok(responses::offset_page(page))
}

/// Changes another account's role. The requested role is validated first.
///
/// # HTTP Request
///
/// `PATCH [base]/api/admin/users/{id}/role` with `{role}`
///
/// # Response
///
/// - `200 OK` - `{message, user}`
/// - `400 Bad Request` - unknown role, or own account
/// - `404 Not Found` - unknown id
pub async fn change_role_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<RoleRequest>,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), ADMINS)?;
    debug!(%id, user = %caller.id(), "Processing role change");

    let role: Role = body
        .role
        .as_deref()
        .unwrap_or_default()
        .parse()?;

    let id = RecordId::parse(&id).ok_or_else(user_not_found)?;
    if &id == caller.id() {
        return Err(RestError::bad_request("You cannot change your own role"));
    }

    let target = state
        .storage()
        .find_user(&id)
        .await?
        .ok_or_else(user_not_found)?;
    let updated = state.storage().set_role(&id, role).await?;

    info!(target = %id, from = %target.role, to = %role, "User role changed");
    state.audit().record(
        AuditEntry::new(AuditAction::UserRoleChanged, AuditResourceType::User)
            .by(caller.id())
            .on(id.as_str())
            .with_details(json!({
                "previousRole": target.role,
                "newRole": role,
            }))
            .from_client(client.ip_address, client.user_agent),
    );

    Ok(responses::success(json!({
        "message": format!("Role updated to {}", role),
        "user": updated.summary(),
    })))
}

/// Deletes another account.
///
/// # HTTP Request
///
/// `DELETE [base]/api/admin/users/{id}`
///
/// # Response
///
/// - `200 OK` - `{message}`
/// - `400 Bad Request` - own account
/// - `404 Not Found` - unknown id
pub async fn delete_user_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    client: ClientInfo,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), ADMINS)?;
    debug!(%id, user = %caller.id(), "Processing user delete");

    let id = RecordId::parse(&id).ok_or_else(user_not_found)?;
    if &id == caller.id() {
        return Err(RestError::bad_request("You cannot delete yourself"));
    }

    let target = state
        .storage()
        .find_user(&id)
        .await?
        .ok_or_else(user_not_found)?;
    state.storage().delete_user(&id).await?;

    info!(target = %id, "User deleted");
    state.audit().record(
        AuditEntry::new(AuditAction::UserDeleted, AuditResourceType::User)
            .by(caller.id())
            .on(id.as_str())
            .with_details(json!({
                "email": target.email,
                "role": target.role,
            }))
            .from_client(client.ip_address, client.user_agent),
    );

    Ok(responses::message("User deleted"))
}

/// Lists audit entries, newest first.
///
/// # HTTP Request
///
/// `GET [base]/api/admin/audit-logs?page&limit&action&userId&from&to`
///
/// # Response
///
/// - `200 OK` - `{success, data, pagination}`
/// - `400 Bad Request` - unknown action, malformed user id or date
pub async fn list_audit_logs_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    params: QueryParams,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), ADMINS)?;

    let action = params
        .get("action")
        .map(|a| a.trim().parse::<AuditAction>())
        .transpose()
        .map_err(|e| RestError::bad_request(e.to_string()))?;
    let user = params
        .get("userId")
        .map(|raw| RecordId::parse(raw).ok_or_else(|| RestError::bad_request("Invalid userId")))
        .transpose()?;

    let query = AuditQuery {
        action,
        user,
        from: date_param(&params, "from")?,
        to: date_param(&params, "to")?,
        page: params.page(),
        limit: params.limit(AuditQuery::DEFAULT_LIMIT, AuditQuery::MAX_LIMIT),
    };
    debug!(page = query.page, limit = query.limit, "Processing audit log listing");

    let page = state.storage().list_audit_logs(&query).await?;
    Ok(responses::offset_page(page))
}

/// Returns the distinct actions present in the trail, for filter menus.
///
/// `GET [base]/api/admin/audit-logs/actions`
pub async fn audit_actions_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), ADMINS)?;
    let actions = state.storage().audit_actions().await?;
    Ok(responses::data(actions))
}
