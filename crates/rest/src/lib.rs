//! # erx-rest - HTTP API for the ERx e-prescription server
//!
//! This crate exposes the ERx JSON API over [axum]: accounts with JWT
//! authentication, the medicine catalog with full-text search, the
//! prescription lifecycle, dashboard statistics, in-app notifications pushed
//! over server-sent events, and administration of users and the audit trail.
//!
//! ## Features
//!
//! - **Role-based access**: doctors manage their own prescriptions,
//!   pharmacists read the catalog, admins see everything
//! - **Cursor paging**: stable `hasMore`/`nextCursor` paging for prescriptions
//!   and notifications
//! - **Catalog search**: FTS5 relevance search with a substring fallback,
//!   cached per normalised query
//! - **Background work**: audit writes and notification delivery never block
//!   a response
//!
//! ## Backend Support
//!
//! - `sqlite` - SQLite backend (default)
//! - `redis` - Redis as the shared response cache
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use erx_rest::{create_app_with_config, ServerConfig};
//! use erx_persistence::backends::sqlite::SqliteBackend;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::open("erx.db")?;
//!     backend.init_schema()?;
//!
//!     let config = ServerConfig::from_env();
//!     let app = create_app_with_config(backend, config);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5001").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failures are returned as `{"success": false, "message": ...}` with the
//! matching status code:
//!
//! | HTTP Status | Meaning |
//! |-------------|---------|
//! | 400 | Validation failure |
//! | 401 | Missing or invalid token |
//! | 403 | Role or ownership mismatch |
//! | 404 | Unknown resource |
//! | 409 | Duplicate account |
//! | 503 | Optional subsystem not configured (adds `reason`) |
//! | 500 | Anything else, with a generic message |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and their JSON rendering
//! - [`config`] - Server configuration
//! - [`state`] - Application state (storage, configuration, workers)
//! - [`auth`] - Tokens, password hashing and access policy
//! - [`cache`] - Fail-open response cache
//! - [`audit`] - Background audit sink
//! - [`notify`] - Notification dispatcher and live subscriptions
//! - [`handlers`] - HTTP request handlers
//! - [`extractors`] - Axum extractors
//! - [`responses`] - Success envelopes
//! - [`routing`] - Route configuration

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod audit;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod notify;
pub mod responses;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use erx_persistence::core::Storage;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with default configuration.
///
/// For more control, use [`create_app_with_config`].
pub fn create_app<S>(storage: S) -> Router
where
    S: Storage,
{
    create_app_with_config(storage, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// Spawns the audit and notification workers, so this must be called from
/// within a Tokio runtime.
///
/// # Example
///
/// ```rust,ignore
/// use erx_rest::{create_app_with_config, ServerConfig};
/// use erx_persistence::backends::sqlite::SqliteBackend;
///
/// let backend = SqliteBackend::in_memory()?;
/// backend.init_schema()?;
/// let app = create_app_with_config(backend, ServerConfig::for_testing());
/// ```
pub fn create_app_with_config<S>(storage: S, config: ServerConfig) -> Router
where
    S: Storage,
{
    info!("Creating REST API server with backend: {}", storage.name());
    create_app_with_state(AppState::new(Arc::new(storage), config))
}

/// Creates the Axum application around an existing state.
///
/// Useful when the caller needs to keep a handle on the state, for example to
/// swap the cache or flush the background workers in tests.
pub fn create_app_with_state<S>(state: AppState<S>) -> Router
where
    S: Storage,
{
    let config = state.config().clone();

    let router = routing::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            std::time::Duration::from_secs(config.request_timeout),
        ));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    let router = if config.enable_request_id {
        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level` when set.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "erx_rest={level},erx_persistence={level},erx={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
