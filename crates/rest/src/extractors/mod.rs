//! Axum extractors.
//!
//! - [`AuthUser`] - authenticated caller, loaded from a bearer token
//! - [`ClientInfo`] - caller address and user agent for the audit trail
//! - [`JsonBody`] - JSON request body with enveloped rejections
//! - [`QueryParams`] - lenient query string access

mod auth;
mod client;
mod json;
mod params;

pub use auth::{AuthUser, bearer_token};
pub use client::{ClientInfo, X_FORWARDED_FOR, X_REAL_IP};
pub use json::JsonBody;
pub use params::QueryParams;
