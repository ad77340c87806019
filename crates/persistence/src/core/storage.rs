//! Record storage traits.
//!
//! Each aggregate gets its own trait so that handlers can be written against
//! exactly the capability they use. [`Storage`] bundles all of them for the
//! application state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageResult;
use crate::types::{
    AuditAction, AuditEntry, AuditLog, AuditQuery, CursorPage, NewNotification, NewPrescription,
    NewUser, Notification, OffsetPage, Prescription, PrescriptionQuery, PrescriptionStats,
    PrescriptionStatus, PrescriptionView, ProfileUpdate, RecordId, Role, User, UserQuery,
};

use super::backend::Backend;
use super::search::MedicineCatalog;

/// User accounts.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(AlreadyExists)` - If the email is taken
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;

    /// Reads an account by id.
    async fn find_user(&self, id: &RecordId) -> StorageResult<Option<User>>;

    /// Reads an account by email (case-insensitive).
    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;

    /// Reads an account by phone number.
    async fn find_user_by_phone(&self, phone: &str) -> StorageResult<Option<User>>;

    /// Applies a self-service profile update.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the account does not exist
    async fn update_profile(&self, id: &RecordId, update: ProfileUpdate) -> StorageResult<User>;

    /// Changes an account's role.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the account does not exist
    async fn set_role(&self, id: &RecordId, role: Role) -> StorageResult<User>;

    /// Removes an account.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the account does not exist
    async fn delete_user(&self, id: &RecordId) -> StorageResult<()>;

    /// Lists accounts, newest first.
    async fn list_users(&self, query: &UserQuery) -> StorageResult<OffsetPage<User>>;
}

/// Prescriptions.
#[async_trait]
pub trait PrescriptionStorage: Send + Sync {
    /// Creates an `active` prescription owned by `doctor`.
    ///
    /// The input is expected to have passed [`NewPrescription::validate`].
    async fn create_prescription(
        &self,
        doctor: &RecordId,
        prescription: NewPrescription,
    ) -> StorageResult<Prescription>;

    /// Reads a prescription by id.
    async fn get_prescription(&self, id: &RecordId) -> StorageResult<Option<Prescription>>;

    /// Persists a new status and bumps `updatedAt`.
    ///
    /// No transition legality is enforced; any status may follow any other.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the prescription does not exist
    async fn set_prescription_status(
        &self,
        id: &RecordId,
        status: PrescriptionStatus,
    ) -> StorageResult<Prescription>;

    /// Lists prescriptions with keyset pagination, joined with the doctor.
    ///
    /// # Errors
    ///
    /// * `StorageError::Search(InvalidDateBound)` - If `from` or `to` cannot be parsed
    async fn list_prescriptions(
        &self,
        query: &PrescriptionQuery,
    ) -> StorageResult<CursorPage<PrescriptionView>>;

    /// Aggregates for the dashboard, optionally scoped to one doctor.
    async fn prescription_stats(
        &self,
        doctor: Option<&RecordId>,
        since: DateTime<Utc>,
    ) -> StorageResult<PrescriptionStats>;
}

/// In-app notifications.
#[async_trait]
pub trait NotificationStorage: Send + Sync {
    /// Persists a notification.
    async fn create_notification(&self, notification: NewNotification)
    -> StorageResult<Notification>;

    /// Lists a user's notifications, newest first.
    async fn list_notifications(
        &self,
        user: &RecordId,
        cursor: Option<&RecordId>,
        limit: usize,
    ) -> StorageResult<CursorPage<Notification>>;

    /// Counts a user's unread notifications.
    async fn unread_count(&self, user: &RecordId) -> StorageResult<u64>;

    /// Marks one notification read. Returns `None` if it does not exist or
    /// belongs to someone else.
    async fn mark_read(&self, user: &RecordId, id: &RecordId)
    -> StorageResult<Option<Notification>>;

    /// Marks all of a user's notifications read, returning how many changed.
    async fn mark_all_read(&self, user: &RecordId) -> StorageResult<u64>;
}

/// The append-only audit trail.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Appends an entry.
    async fn append_audit(&self, entry: AuditEntry) -> StorageResult<RecordId>;

    /// Lists entries, newest first, joined with the acting user.
    async fn list_audit_logs(&self, query: &AuditQuery) -> StorageResult<OffsetPage<AuditLog>>;

    /// Returns the distinct actions present in the trail.
    async fn audit_actions(&self) -> StorageResult<Vec<AuditAction>>;

    /// Deletes entries written before `cutoff`, returning how many were removed.
    async fn purge_audit_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;
}

/// Everything the application needs from a backend.
pub trait Storage:
    Backend
    + UserStorage
    + PrescriptionStorage
    + MedicineCatalog
    + NotificationStorage
    + AuditStorage
    + 'static
{
}

impl<T> Storage for T where
    T: Backend
        + UserStorage
        + PrescriptionStorage
        + MedicineCatalog
        + NotificationStorage
        + AuditStorage
        + 'static
{
}
