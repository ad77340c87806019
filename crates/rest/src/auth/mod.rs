//! Authentication and authorization.
//!
//! - [`token`] - HS256 access tokens
//! - [`password`] - Argon2id password hashing
//! - [`policy`] - role and ownership checks

pub mod password;
pub mod policy;
pub mod token;

pub use password::{
    MIN_PASSWORD_LEN, hash_password, hash_password_off_thread, verify_password,
    verify_password_off_thread,
};
pub use policy::{ADMINS, PRESCRIBERS, can_manage_prescription, listing_scope, require_role};
pub use token::{Claims, TokenError, TokenService};
