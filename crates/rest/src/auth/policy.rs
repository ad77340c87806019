//! Role and ownership checks.
//!
//! These are pure functions over the caller's role and the owner of the
//! record being touched, so handlers never compare role strings.

use erx_persistence::types::{RecordId, Role};

use crate::error::RestError;

/// Roles allowed to write prescriptions.
pub const PRESCRIBERS: &[Role] = &[Role::Doctor, Role::Admin];

/// Roles allowed into the administration surface.
pub const ADMINS: &[Role] = &[Role::Admin];

/// Fails with 403 unless `role` is one of `allowed`.
pub fn require_role(role: Role, allowed: &[Role]) -> Result<(), RestError> {
    if allowed.contains(&role) {
        return Ok(());
    }
    let required = allowed
        .iter()
        .map(Role::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Err(RestError::forbidden(format!(
        "Access denied. Required role(s): {}. Your role: {}",
        required, role
    )))
}

/// Returns true if the caller may read or mutate a prescription owned by `owner`.
pub fn can_manage_prescription(role: Role, requester: &RecordId, owner: &RecordId) -> bool {
    role.is_admin() || requester == owner
}

/// The doctor a listing must be restricted to, if any.
pub fn listing_scope(role: Role, requester: &RecordId) -> Option<RecordId> {
    if role.is_admin() {
        None
    } else {
        Some(requester.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erx_persistence::types::IdGenerator;

    #[test]
    fn test_require_role_message() {
        assert!(require_role(Role::Admin, ADMINS).is_ok());
        let err = require_role(Role::Pharmacist, PRESCRIBERS).unwrap_err();
        assert_eq!(
            err.public_message(),
            "Access denied. Required role(s): doctor, admin. Your role: pharmacist"
        );
    }

    #[test]
    fn test_ownership() {
        let ids = IdGenerator::new();
        let (a, b) = (ids.next_id(), ids.next_id());
        assert!(can_manage_prescription(Role::Doctor, &a, &a));
        assert!(!can_manage_prescription(Role::Doctor, &a, &b));
        assert!(can_manage_prescription(Role::Admin, &a, &b));
        assert!(!can_manage_prescription(Role::Pharmacist, &a, &b));
    }

    #[test]
    fn test_listing_scope() {
        let ids = IdGenerator::new();
        let me = ids.next_id();
        assert_eq!(listing_scope(Role::Doctor, &me), Some(me.clone()));
        assert_eq!(listing_scope(Role::Pharmacist, &me), Some(me.clone()));
        assert_eq!(listing_scope(Role::Admin, &me), None);
    }
}
