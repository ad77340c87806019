//! HTTP request handlers.
//!
//! - [`auth`] - Signup, login, profile and Google sign-in
//! - [`medicines`] - Catalog listing, search and admin updates
//! - [`prescriptions`] - Prescription lifecycle
//! - [`dashboard`] - Aggregated statistics
//! - [`notifications`] - In-app notifications and the SSE stream
//! - [`admin`] - User management and audit logs
//! - [`uploads`] - Profile picture and prescription attachment uploads
//! - [`health`] - Health check endpoints

pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod medicines;
pub mod notifications;
pub mod prescriptions;
pub mod uploads;

// Re-export handlers for convenience
pub use admin::{
    audit_actions_handler, change_role_handler, delete_user_handler, list_audit_logs_handler,
    list_users_handler,
};
pub use auth::{
    google_handler, login_handler, logout_handler, profile_handler, signup_handler,
    update_profile_handler,
};
pub use dashboard::stats_handler;
pub use health::{health_handler, liveness_handler, readiness_handler};
pub use medicines::{
    get_medicine_handler, list_medicines_handler, search_medicines_handler,
    update_medicine_handler,
};
pub use notifications::{
    list_notifications_handler, mark_all_read_handler, mark_read_handler,
    stream_notifications_handler, unread_count_handler,
};
pub use prescriptions::{
    create_prescription_handler, delete_prescription_handler, get_prescription_handler,
    list_prescriptions_handler, update_status_handler,
};
pub use uploads::{upload_prescription_handler, upload_profile_handler};
