//! Success response envelopes.
//!
//! Successful responses carry `"success": true` alongside their payload:
//!
//! ```json
//! { "success": true, "data": [...], "pagination": { "hasMore": false, "nextCursor": null, "limit": 10 } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use erx_persistence::types::{CursorPage, OffsetPage};
use serde::Serialize;
use serde_json::{Value, json};

/// `200` with `{success, data}`.
pub fn data<T: Serialize>(data: T) -> Response {
    with_status(StatusCode::OK, json!({ "success": true, "data": data }))
}

/// `201` with `{success, data}`.
pub fn created<T: Serialize>(data: T) -> Response {
    with_status(StatusCode::CREATED, json!({ "success": true, "data": data }))
}

/// `200` with `{success, message}`.
pub fn message(message: &str) -> Response {
    with_status(StatusCode::OK, json!({ "success": true, "message": message }))
}

/// `200` with `{success, data, pagination}` for a cursor page.
pub fn cursor_page<T: Serialize>(page: CursorPage<T>) -> Response {
    with_status(
        StatusCode::OK,
        json!({ "success": true, "data": page.data, "pagination": page.pagination }),
    )
}

/// `200` with `{success, data, pagination}` for an offset page.
pub fn offset_page<T: Serialize>(page: OffsetPage<T>) -> Response {
    with_status(
        StatusCode::OK,
        json!({ "success": true, "data": page.data, "pagination": page.pagination }),
    )
}

/// Adds `"success": true` to an object body.
pub fn success(mut body: Value) -> Response {
    if let Some(object) = body.as_object_mut() {
        object.insert("success".to_string(), Value::Bool(true));
    }
    with_status(StatusCode::OK, body)
}

/// Serializes `body` with `status`.
pub fn with_status(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}
