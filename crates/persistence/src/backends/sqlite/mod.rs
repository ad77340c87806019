//! SQLite backend implementation.
//!
//! This module implements every storage trait on top of SQLite. It supports
//! in-memory databases (used by the test suites) and file-based databases.
//!
//! # Features
//!
//! - In-memory and file-based modes
//! - Monotonic record ids that double as keyset pagination cursors
//! - FTS5 index over the medicine catalog, kept in sync by triggers
//! - Literal `LIKE` fallback when the index is missing or finds nothing
//!
//! # Example
//!
//! ```no_run
//! use erx_persistence::backends::sqlite::SqliteBackend;
//! use erx_persistence::core::MedicineCatalog;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::in_memory()?;
//! backend.init_schema()?;
//!
//! let result = backend.search_medicines("paracetamol", 20).await?;
//! println!("{} hits via {:?}", result.medicines.len(), result.strategy);
//! # Ok(())
//! # }
//! ```
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE medicines (
//!     seq INTEGER PRIMARY KEY AUTOINCREMENT,  -- natural order, FTS rowid
//!     id TEXT NOT NULL UNIQUE,
//!     name TEXT NOT NULL,
//!     ...
//! );
//!
//! CREATE VIRTUAL TABLE medicines_fts USING fts5(
//!     name, composition, description, manufacturer,
//!     content='medicines', content_rowid='seq'
//! );
//! ```
//!
//! Users, prescriptions, notifications and audit entries are keyed by
//! [`RecordId`](crate::types::RecordId) text columns.

mod audit;
mod backend;
mod fts;
mod medicines;
mod notifications;
mod prescriptions;
mod schema;
mod sql;
mod users;

pub use backend::{SqliteBackend, SqliteBackendConfig};
