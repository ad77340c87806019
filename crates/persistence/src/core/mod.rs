//! Core storage traits and abstractions.
//!
//! - [`Backend`] - Database driver lifecycle
//! - [`UserStorage`], [`PrescriptionStorage`], [`NotificationStorage`],
//!   [`AuditStorage`] - Record storage per aggregate
//! - [`MedicineCatalog`] - Catalog access with full-text search and fallback
//! - [`Storage`] - Everything above, as one bound for application state
//!
//! # Example: Writing against a capability
//!
//! ```ignore
//! use erx_persistence::core::PrescriptionStorage;
//! use erx_persistence::types::{PrescriptionQuery, RecordId};
//! use erx_persistence::error::StorageResult;
//!
//! async fn own_records<S: PrescriptionStorage>(
//!     storage: &S,
//!     doctor: &RecordId,
//! ) -> StorageResult<usize> {
//!     let mut query = PrescriptionQuery::default();
//!     query.filter.doctor = Some(doctor.clone());
//!     let page = storage.list_prescriptions(&query).await?;
//!     Ok(page.data.len())
//! }
//! ```

mod backend;
mod search;
mod storage;

pub use backend::{Backend, BackendKind};
pub use search::{
    DEFAULT_SEARCH_LIMIT, MIN_SEARCH_QUERY_LEN, MedicineCatalog, normalize_search_query,
};
pub use storage::{
    AuditStorage, NotificationStorage, PrescriptionStorage, Storage, UserStorage,
};
