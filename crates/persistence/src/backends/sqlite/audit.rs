//! [`AuditStorage`] for SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params, params_from_iter, types::Value};

use crate::core::AuditStorage;
use crate::error::StorageResult;
use crate::types::{AuditAction, AuditEntry, AuditLog, AuditQuery, OffsetPage, RecordId, UserSummary};

use super::SqliteBackend;
use super::sql::{format_ts, internal_error, ts_column};

fn map_audit_log(row: &Row<'_>) -> rusqlite::Result<AuditLog> {
    let user_id: Option<RecordId> = row.get(1)?;
    let joined_id: Option<RecordId> = row.get(9)?;
    let user = match joined_id {
        Some(id) => Some(UserSummary {
            id,
            name: row.get(10)?,
            email: row.get(11)?,
            role: row.get(12)?,
        }),
        None => None,
    };
    let details: Option<String> = row.get(5)?;

    Ok(AuditLog {
        id: row.get(0)?,
        user_id,
        user,
        action: row.get(2)?,
        resource_type: row.get(3)?,
        resource_id: row.get(4)?,
        details: details
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(serde_json::Value::Null),
        ip_address: row.get(6)?,
        user_agent: row.get(7)?,
        created_at: ts_column(row, 8)?,
    })
}

#[async_trait]
impl AuditStorage for SqliteBackend {
    async fn append_audit(&self, entry: AuditEntry) -> StorageResult<RecordId> {
        let id = self.next_id();
        let details = serde_json::to_string(&entry.details)?;

        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO audit_logs (id, user_id, action, resource_type, resource_id, details,
                ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                entry.user,
                entry.action,
                entry.resource_type,
                entry.resource_id,
                details,
                entry.ip_address,
                entry.user_agent,
                format_ts(&id.timestamp()),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to append audit entry: {}", e)))?;

        Ok(id)
    }

    async fn list_audit_logs(&self, query: &AuditQuery) -> StorageResult<OffsetPage<AuditLog>> {
        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(action) = query.action {
            conditions.push("a.action = ?");
            values.push(Value::Text(action.as_str().to_string()));
        }
        if let Some(user) = &query.user {
            conditions.push("a.user_id = ?");
            values.push(Value::Text(user.to_string()));
        }
        if let Some(from) = &query.from {
            conditions.push("a.created_at >= ?");
            values.push(Value::Text(format_ts(from)));
        }
        if let Some(to) = &query.to {
            conditions.push("a.created_at <= ?");
            values.push(Value::Text(format_ts(to)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let conn = self.get_connection()?;
        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM audit_logs a {}", where_clause),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|e| internal_error(format!("Failed to count audit entries: {}", e)))?;

        let limit = query.limit.clamp(1, AuditQuery::MAX_LIMIT);
        let page = query.page.max(1);
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(OffsetPage::<AuditLog>::offset_of(page, limit) as i64));

        let sql = format!(
            "SELECT a.id, a.user_id, a.action, a.resource_type, a.resource_id, a.details,
                    a.ip_address, a.user_agent, a.created_at,
                    u.id, u.name, u.email, u.role
             FROM audit_logs a
             LEFT JOIN users u ON u.id = a.user_id
             {}
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ? OFFSET ?",
            where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare audit listing: {}", e)))?;
        let logs = stmt
            .query_map(params_from_iter(values.iter()), map_audit_log)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to list audit entries: {}", e)))?;

        Ok(OffsetPage::new(logs, total.max(0) as u64, page, limit))
    }

    async fn audit_actions(&self) -> StorageResult<Vec<AuditAction>> {
        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT action FROM audit_logs ORDER BY action")
            .map_err(|e| internal_error(format!("Failed to prepare action listing: {}", e)))?;
        stmt.query_map([], |row| row.get(0))
            .and_then(|rows| rows.collect::<Result<Vec<AuditAction>, _>>())
            .map_err(|e| internal_error(format!("Failed to list audit actions: {}", e)))
    }

    async fn purge_audit_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let removed = conn
            .execute(
                "DELETE FROM audit_logs WHERE created_at < ?1",
                [format_ts(&cutoff)],
            )
            .map_err(|e| internal_error(format!("Failed to purge audit entries: {}", e)))?;
        Ok(removed as u64)
    }
}
