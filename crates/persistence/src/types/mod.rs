//! Domain types for the persistence layer.
//!
//! - [`RecordId`], [`IdGenerator`] - insertion-ordered identifiers
//! - [`User`], [`Role`] - accounts
//! - [`Medicine`], [`CatalogSearch`] - the medicine catalog
//! - [`Prescription`], [`PrescriptionStatus`] - prescriptions
//! - [`Notification`] - in-app notifications
//! - [`AuditEntry`], [`AuditLog`] - the audit trail
//! - [`CursorPage`], [`OffsetPage`] - pagination
//!
//! # Examples
//!
//! ```
//! use erx_persistence::types::{CursorPage, IdGenerator};
//!
//! let ids = IdGenerator::new();
//! let rows: Vec<_> = (0..3).map(|_| ids.next_id()).collect();
//! let page = CursorPage::from_overfetch(rows.clone(), 2, |id| id);
//!
//! assert!(page.pagination.has_more);
//! assert_eq!(page.pagination.next_cursor.as_ref(), Some(&rows[1]));
//! ```

mod audit;
mod id;
mod medicine;
mod notification;
mod pagination;
mod prescription;
mod user;

pub use audit::{
    AuditAction, AuditEntry, AuditLog, AuditQuery, AuditResourceType,
    DEFAULT_AUDIT_RETENTION_DAYS,
};
pub use id::{IdGenerator, RecordId};
pub use medicine::{
    CatalogSearch, Medicine, MedicineList, MedicineUpdate, NewMedicine, SearchStrategy,
};
pub use notification::{NewNotification, Notification};
pub use pagination::{
    CursorInfo, CursorPage, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, OffsetInfo, OffsetPage,
    PrescriptionFilter, PrescriptionQuery, SortDirection, parse_date_bound, resolve_cursor,
    resolve_limit,
};
pub use prescription::{
    DailyCount, DiagnosisCount, MAX_PATIENT_AGE, NewPrescription, PrescribedMedicine,
    Prescription, PrescriptionStats, PrescriptionStatus, PrescriptionView,
};
pub use user::{NewUser, ProfileUpdate, Role, User, UserQuery, UserSummary};
