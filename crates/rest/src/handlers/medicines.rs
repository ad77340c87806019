//! Medicine catalog handlers.
//!
//! Listing and search are public. Updates require the admin role and
//! invalidate both the cached entry and every cached search.

use axum::{
    extract::{Path, State},
    response::Response,
};
use erx_persistence::core::{Storage, normalize_search_query};
use erx_persistence::types::{
    AuditAction, AuditEntry, AuditResourceType, CatalogSearch, Medicine, MedicineUpdate, RecordId,
    resolve_limit,
};
use serde_json::json;
use tracing::debug;

use crate::auth::{ADMINS, require_role};
use crate::cache::{self, get_json, invalidate, invalidate_searches, set_json};
use crate::error::{RestError, RestResult};
use crate::extractors::{AuthUser, ClientInfo, JsonBody, QueryParams};
use crate::responses;
use crate::state::AppState;

/// Upper bound on `limit` for the catalog listing.
pub const MAX_MEDICINE_PAGE_SIZE: usize = 100;

fn medicine_not_found() -> RestError {
    RestError::not_found("Medicine not found")
}

/// Lists the catalog with offset paging.
///
/// # HTTP Request
///
/// `GET [base]/api/medicines?limit&skip`
///
/// # Response
///
/// `{success, data, total, limit, skip}`
pub async fn list_medicines_handler<S>(
    State(state): State<AppState<S>>,
    params: QueryParams,
) -> RestResult<Response>
where
    S: Storage,
{
    let limit = resolve_limit(
        params.get("limit"),
        state.config().medicine_page_size,
        MAX_MEDICINE_PAGE_SIZE,
    );
    let skip = params.number("skip", 0);
    debug!(limit, skip, "Processing medicine listing");

    let list = state.storage().list_medicines(limit, skip).await?;
    Ok(responses::success(json!({
        "data": list.data,
        "total": list.total,
        "limit": list.limit,
        "skip": list.skip,
    })))
}

/// Searches the catalog, using the full-text index when it can.
///
/// # HTTP Request
///
/// `GET [base]/api/medicines/search?q`
///
/// # Response
///
/// `{success, data}`, plus `message` when the query is too short.
pub async fn search_medicines_handler<S>(
    State(state): State<AppState<S>>,
    params: QueryParams,
    client: ClientInfo,
) -> RestResult<Response>
where
    S: Storage,
{
    let query = normalize_search_query(params.get("q").unwrap_or_default());
    debug!(%query, "Processing medicine search");

    let key = cache::search_key(state.cache(), &query).await;
    if let Some(cached) = get_json::<Vec<Medicine>>(state.cache(), &key).await {
        return Ok(responses::data(cached));
    }

    let limit = state.config().search_result_limit;
    let result = state.storage().search_medicines(&query, limit).await?;

    if let Some(notice) = result.notice() {
        return Ok(responses::success(json!({ "data": [], "message": notice })));
    }

    set_json(state.cache(), &key, &result.medicines, state.cache_ttl()).await;
    state.audit().record(search_audit(&query, &result, client));

    Ok(responses::data(result.medicines))
}

fn search_audit(query: &str, result: &CatalogSearch, client: ClientInfo) -> AuditEntry {
    AuditEntry::new(AuditAction::MedicineSearched, AuditResourceType::Medicine)
        .with_details(json!({
            "query": query,
            "results": result.medicines.len(),
            "strategy": result.strategy,
        }))
        .from_client(client.ip_address, client.user_agent)
}

/// Returns one catalog entry.
///
/// `GET [base]/api/medicines/{id}`
pub async fn get_medicine_handler<S>(
    State(state): State<AppState<S>>,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(%id, "Processing medicine read");
    let id = RecordId::parse(&id).ok_or_else(medicine_not_found)?;

    let key = cache::medicine_key(id.as_str());
    if let Some(cached) = get_json::<Medicine>(state.cache(), &key).await {
        return Ok(responses::data(cached));
    }

    let medicine = state
        .storage()
        .get_medicine(&id)
        .await?
        .ok_or_else(medicine_not_found)?;

    set_json(state.cache(), &key, &medicine, state.cache_ttl()).await;
    Ok(responses::data(medicine))
}

/// Updates price, description, side effects, packaging or availability.
///
/// # HTTP Request
///
/// `PATCH [base]/api/medicines/{id}` (admin)
///
/// # Response
///
/// - `200 OK` - updated entry
/// - `400 Bad Request` - empty update
/// - `403 Forbidden` - caller is not an admin
/// - `404 Not Found` - unknown id
pub async fn update_medicine_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<MedicineUpdate>,
) -> RestResult<Response>
where
    S: Storage,
{
    require_role(caller.role(), ADMINS)?;
    debug!(%id, user = %caller.id(), "Processing medicine update");

    let id = RecordId::parse(&id).ok_or_else(medicine_not_found)?;
    if update.is_empty() {
        return Err(RestError::bad_request("No updatable fields provided"));
    }

    let medicine = state.storage().update_medicine(&id, update).await?;
    invalidate(state.cache(), &cache::medicine_key(id.as_str())).await;
    invalidate_searches(state.cache(), state.cache_ttl()).await;

    Ok(responses::data(medicine))
}
