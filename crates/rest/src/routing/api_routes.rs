//! ERx route configuration.
//!
//! Defines all routes for the HTTP API.

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use erx_persistence::core::Storage;

use crate::handlers;
use crate::state::AppState;

/// Path prefix of the JSON API.
pub const API_PREFIX: &str = "/api";

/// Creates all routes.
///
/// # Routes
///
/// ## Probes
/// - `GET /health`, `GET /_liveness`, `GET /_readiness`
///
/// ## Accounts (`/api/auth`)
/// - `POST /signup`, `POST /login`, `POST /logout`
/// - `GET /profile`, `PATCH /profile`
/// - `GET /google`
///
/// ## Catalog (`/api/medicines`)
/// - `GET /` - Offset listing
/// - `GET /search` - Full-text search with fallback
/// - `GET /{id}`, `PATCH /{id}` (admin)
///
/// ## Prescriptions (`/api/prescriptions`)
/// - `GET /`, `POST /`
/// - `GET /{id}`, `DELETE /{id}`
/// - `PATCH /{id}/status`
///
/// ## Dashboard, notifications, admin, uploads
/// - `GET /api/dashboard/stats`
/// - `GET /api/notifications`, `GET /api/notifications/unread-count`,
///   `GET /api/notifications/stream`, `PATCH /api/notifications/read-all`,
///   `PATCH /api/notifications/{id}/read`
/// - `GET /api/admin/users`, `PATCH /api/admin/users/{id}/role`,
///   `DELETE /api/admin/users/{id}`, `GET /api/admin/audit-logs`,
///   `GET /api/admin/audit-logs/actions`
/// - `POST /api/uploads/profile`
/// - `POST /api/uploads/prescription`
pub fn create_routes<S>(state: AppState<S>) -> Router
where
    S: Storage,
{
    Router::new()
        .route("/health", get(handlers::health_handler::<S>))
        .route("/_liveness", get(handlers::liveness_handler))
        .route("/_readiness", get(handlers::readiness_handler::<S>))
        .nest(API_PREFIX, api_routes::<S>())
        .with_state(state)
}

fn api_routes<S>() -> Router<AppState<S>>
where
    S: Storage,
{
    Router::new()
        // Accounts
        .route("/auth/signup", post(handlers::signup_handler::<S>))
        .route("/auth/login", post(handlers::login_handler::<S>))
        .route("/auth/logout", post(handlers::logout_handler))
        .route(
            "/auth/profile",
            get(handlers::profile_handler::<S>).patch(handlers::update_profile_handler::<S>),
        )
        .route("/auth/google", get(handlers::google_handler::<S>))
        // Catalog
        .route("/medicines", get(handlers::list_medicines_handler::<S>))
        .route(
            "/medicines/search",
            get(handlers::search_medicines_handler::<S>),
        )
        .route(
            "/medicines/{id}",
            get(handlers::get_medicine_handler::<S>).patch(handlers::update_medicine_handler::<S>),
        )
        // Prescriptions
        .route(
            "/prescriptions",
            get(handlers::list_prescriptions_handler::<S>)
                .post(handlers::create_prescription_handler::<S>),
        )
        .route(
            "/prescriptions/{id}",
            get(handlers::get_prescription_handler::<S>)
                .delete(handlers::delete_prescription_handler::<S>),
        )
        .route(
            "/prescriptions/{id}/status",
            patch(handlers::update_status_handler::<S>),
        )
        // Dashboard
        .route("/dashboard/stats", get(handlers::stats_handler::<S>))
        // Notifications
        .route(
            "/notifications",
            get(handlers::list_notifications_handler::<S>),
        )
        .route(
            "/notifications/unread-count",
            get(handlers::unread_count_handler::<S>),
        )
        .route(
            "/notifications/stream",
            get(handlers::stream_notifications_handler::<S>),
        )
        .route(
            "/notifications/read-all",
            patch(handlers::mark_all_read_handler::<S>),
        )
        .route(
            "/notifications/{id}/read",
            patch(handlers::mark_read_handler::<S>),
        )
        // Administration
        .route("/admin/users", get(handlers::list_users_handler::<S>))
        .route(
            "/admin/users/{id}/role",
            patch(handlers::change_role_handler::<S>),
        )
        .route(
            "/admin/users/{id}",
            delete(handlers::delete_user_handler::<S>),
        )
        .route(
            "/admin/audit-logs",
            get(handlers::list_audit_logs_handler::<S>),
        )
        .route(
            "/admin/audit-logs/actions",
            get(handlers::audit_actions_handler::<S>),
        )
        // Uploads
        .route("/uploads/profile", post(handlers::upload_profile_handler::<S>))
        .route(
            "/uploads/prescription",
            post(handlers::upload_prescription_handler::<S>),
        )
}
