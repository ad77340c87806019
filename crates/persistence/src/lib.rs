//! ERx persistence layer.
//!
//! This crate stores the records behind the e-prescription server: user
//! accounts, the medicine catalog, prescriptions, in-app notifications and
//! the audit trail. Storage is expressed as async traits so the HTTP layer
//! never depends on a concrete database.
//!
//! # Backend Features
//!
//! - `sqlite` (default) - SQLite with in-memory and file modes, FTS5 catalog search
//!
//! # Architecture
//!
//! - [`types`] - Records, identifiers and pagination
//! - [`error`] - Error types for all operations
//! - [`core`] - Storage traits, including the catalog search fallback policy
//! - [`backends`] - Backend implementations
//! - [`import`] - Bulk catalog loading from CSV
//!
//! # Quick Start
//!
//! ```no_run
//! use erx_persistence::backends::sqlite::SqliteBackend;
//! use erx_persistence::core::PrescriptionStorage;
//! use erx_persistence::types::{IdGenerator, NewPrescription, PrescriptionQuery};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let doctor = IdGenerator::new().next_id();
//! let input = NewPrescription {
//!     patient_name: "Jane Doe".to_string(),
//!     patient_age: Some(34),
//!     diagnosis: "Migraine".to_string(),
//!     ..Default::default()
//! };
//! backend.create_prescription(&doctor, input).await?;
//!
//! let page = backend.list_prescriptions(&PrescriptionQuery::default()).await?;
//! assert_eq!(page.data.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;
pub mod import;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{StorageError, StorageResult};
pub use types::{CursorPage, OffsetPage, RecordId};

// Re-export core traits
pub use core::{
    AuditStorage, Backend, BackendKind, MedicineCatalog, NotificationStorage,
    PrescriptionStorage, Storage, UserStorage,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
