//! In-app notification handlers.
//!
//! Every route is scoped to the caller; nobody can read or mark another
//! user's notifications.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use erx_persistence::core::Storage;
use erx_persistence::types::RecordId;
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{RestError, RestResult};
use crate::extractors::{AuthUser, QueryParams};
use crate::responses;
use crate::state::AppState;

/// Default page size for the notification listing.
pub const DEFAULT_NOTIFICATION_PAGE_SIZE: usize = 20;

/// SSE event name for pushed notifications.
pub const NOTIFICATION_EVENT: &str = "notification";

fn notification_not_found() -> RestError {
    RestError::not_found("Notification not found")
}

/// Lists the caller's notifications, newest first.
///
/// # HTTP Request
///
/// `GET [base]/api/notifications?limit&cursor`
///
/// # Response
///
/// `{success, data, pagination: {hasMore, nextCursor, limit}}`
pub async fn list_notifications_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    params: QueryParams,
) -> RestResult<Response>
where
    S: Storage,
{
    let limit = params.limit(DEFAULT_NOTIFICATION_PAGE_SIZE, state.max_page_size());
    let cursor = params.cursor();
    debug!(user = %caller.id(), limit, cursor = ?cursor, "Processing notification listing");

    let page = state
        .storage()
        .list_notifications(caller.id(), cursor.as_ref(), limit)
        .await?;
    Ok(responses::cursor_page(page))
}

/// `GET [base]/api/notifications/unread-count`
pub async fn unread_count_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> RestResult<Response>
where
    S: Storage,
{
    let count = state.storage().unread_count(caller.id()).await?;
    Ok(responses::success(json!({ "count": count })))
}

/// Marks one of the caller's notifications read.
///
/// # HTTP Request
///
/// `PATCH [base]/api/notifications/{id}/read`
///
/// # Response
///
/// - `200 OK` - the updated notification
/// - `404 Not Found` - unknown id, or owned by someone else
pub async fn mark_read_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
    Path(id): Path<String>,
) -> RestResult<Response>
where
    S: Storage,
{
    debug!(%id, user = %caller.id(), "Processing notification mark read");
    let id = RecordId::parse(&id).ok_or_else(notification_not_found)?;

    let notification = state
        .storage()
        .mark_read(caller.id(), &id)
        .await?
        .ok_or_else(notification_not_found)?;
    Ok(responses::data(notification))
}

/// `PATCH [base]/api/notifications/read-all`
pub async fn mark_all_read_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> RestResult<Response>
where
    S: Storage,
{
    let updated = state.storage().mark_all_read(caller.id()).await?;
    debug!(user = %caller.id(), updated, "Marked all notifications read");

    Ok(responses::success(json!({
        "message": "All notifications marked as read",
        "updated": updated,
    })))
}

/// Streams the caller's new notifications as server-sent events.
///
/// # HTTP Request
///
/// `GET [base]/api/notifications/stream`
///
/// # Response
///
/// `text/event-stream` with one `notification` event per delivery.
pub async fn stream_notifications_handler<S>(
    State(state): State<AppState<S>>,
    caller: AuthUser,
) -> Response
where
    S: Storage,
{
    debug!(user = %caller.id(), "Opening notification stream");

    let events = state
        .notifier()
        .subscribe(caller.id().clone())
        .filter_map(|notification| async move {
            match Event::default()
                .event(NOTIFICATION_EVENT)
                .json_data(&notification)
            {
                Ok(event) => Some(Ok::<_, Infallible>(event)),
                Err(e) => {
                    warn!(error = %e, "Failed to encode notification event");
                    None
                }
            }
        });

    Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response()
}
