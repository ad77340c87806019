//! SQLite schema definitions and migrations.

use rusqlite::{Connection, OptionalExtension};
use tracing::{info, warn};

use crate::error::StorageResult;
use crate::types::RecordId;

use super::fts::MedicineTextIndex;
use super::sql::internal_error;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version > SCHEMA_VERSION {
        return Err(internal_error(format!(
            "Database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> StorageResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )
    .map_err(|e| internal_error(format!("Failed to create schema_version table: {}", e)))?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()
        .map_err(|e| internal_error(format!("Failed to read schema_version: {}", e)))?;

    Ok(version.unwrap_or(0))
}

/// Set the schema version.
fn set_schema_version(conn: &Connection, version: i32) -> StorageResult<()> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| internal_error(format!("Failed to clear schema_version: {}", e)))?;

    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )
    .map_err(|e| internal_error(format!("Failed to set schema_version: {}", e)))?;

    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            phone TEXT,
            password_hash TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'doctor',
            profile_picture TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_phone ON users(phone);
        CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);",
    )
    .map_err(|e| internal_error(format!("Failed to create users table: {}", e)))?;

    // `seq` is the rowid the text index points at; `id` is the public key.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS medicines (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            composition TEXT,
            price REAL,
            manufacturer TEXT,
            type TEXT NOT NULL DEFAULT 'allopathy',
            description TEXT,
            side_effects TEXT,
            drug_interactions TEXT,
            packaging TEXT,
            is_discontinued INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_medicines_name ON medicines(name);",
    )
    .map_err(|e| internal_error(format!("Failed to create medicines table: {}", e)))?;

    // No foreign key on doctor_id: prescriptions outlive deleted accounts.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS prescriptions (
            id TEXT PRIMARY KEY,
            patient_name TEXT NOT NULL,
            patient_age INTEGER NOT NULL,
            patient_email TEXT,
            doctor_id TEXT NOT NULL,
            medicines TEXT NOT NULL DEFAULT '[]',
            diagnosis TEXT NOT NULL,
            doctor_notes TEXT,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_prescriptions_doctor
            ON prescriptions(doctor_id, created_at, id);
        CREATE INDEX IF NOT EXISTS idx_prescriptions_created
            ON prescriptions(created_at, id);
        CREATE INDEX IF NOT EXISTS idx_prescriptions_status ON prescriptions(status);",
    )
    .map_err(|e| internal_error(format!("Failed to create prescriptions table: {}", e)))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            type TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, id);",
    )
    .map_err(|e| internal_error(format!("Failed to create notifications table: {}", e)))?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            action TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            resource_id TEXT,
            details TEXT NOT NULL DEFAULT '{}',
            ip_address TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_logs(created_at);
        CREATE INDEX IF NOT EXISTS idx_audit_user ON audit_logs(user_id);
        CREATE INDEX IF NOT EXISTS idx_audit_action ON audit_logs(action);",
    )
    .map_err(|e| internal_error(format!("Failed to create audit_logs table: {}", e)))?;

    Ok(())
}

/// Creates or drops the catalog text index.
///
/// Creation is best-effort: a SQLite build without FTS5 leaves the catalog
/// without an index, which catalog search tolerates.
pub fn configure_text_index(conn: &Connection, enabled: bool) -> StorageResult<()> {
    if !enabled {
        conn.execute_batch(MedicineTextIndex::drop_sql())
            .map_err(|e| internal_error(format!("Failed to drop text index: {}", e)))?;
        return Ok(());
    }

    if !fts5_available(conn) {
        warn!("SQLite was built without FTS5; catalog search will use substring matching");
        return Ok(());
    }

    let existed = table_exists(conn, MedicineTextIndex::TABLE_NAME)?;

    conn.execute_batch(MedicineTextIndex::create_table_sql())
        .map_err(|e| internal_error(format!("Failed to create text index: {}", e)))?;
    conn.execute_batch(MedicineTextIndex::create_triggers_sql())
        .map_err(|e| internal_error(format!("Failed to create text index triggers: {}", e)))?;

    if !existed {
        conn.execute_batch(MedicineTextIndex::rebuild_sql())
            .map_err(|e| internal_error(format!("Failed to build text index: {}", e)))?;
        info!("Built catalog text index");
    }

    Ok(())
}

fn fts5_available(conn: &Connection) -> bool {
    conn.query_row(
        "SELECT sqlite_compileoption_used('ENABLE_FTS5')",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|used| used == 1)
    .unwrap_or(false)
}

fn table_exists(conn: &Connection, name: &str) -> StorageResult<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Returns the largest record id in any table, used to seed the id generator.
pub fn max_record_id(conn: &Connection) -> StorageResult<Option<RecordId>> {
    let max: Option<String> = conn.query_row(
        "SELECT MAX(id) FROM (
            SELECT MAX(id) AS id FROM users
            UNION ALL SELECT MAX(id) FROM medicines
            UNION ALL SELECT MAX(id) FROM prescriptions
            UNION ALL SELECT MAX(id) FROM notifications
            UNION ALL SELECT MAX(id) FROM audit_logs
        )",
        [],
        |row| row.get(0),
    )?;
    Ok(max.and_then(|id| RecordId::parse(&id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_text_index_toggle() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();

        configure_text_index(&conn, true).unwrap();
        assert!(table_exists(&conn, MedicineTextIndex::TABLE_NAME).unwrap());

        configure_text_index(&conn, false).unwrap();
        assert!(!table_exists(&conn, MedicineTextIndex::TABLE_NAME).unwrap());
    }

    #[test]
    fn test_max_record_id_empty() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert!(max_record_id(&conn).unwrap().is_none());
    }
}
