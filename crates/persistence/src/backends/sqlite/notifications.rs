//! [`NotificationStorage`] for SQLite.

use async_trait::async_trait;
use rusqlite::{OptionalExtension, Row, params, params_from_iter, types::Value};

use crate::core::NotificationStorage;
use crate::error::StorageResult;
use crate::types::{CursorPage, NewNotification, Notification, RecordId};

use super::SqliteBackend;
use super::sql::{format_ts, internal_error, ts_column};

const NOTIFICATION_COLUMNS: &str = "id, user_id, type, title, message, read, created_at";

fn map_notification(row: &Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        user: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        read: row.get(5)?,
        created_at: ts_column(row, 6)?,
    })
}

#[async_trait]
impl NotificationStorage for SqliteBackend {
    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> StorageResult<Notification> {
        let id = self.next_id();
        let record = Notification {
            created_at: id.timestamp(),
            id,
            user: notification.user,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            read: false,
        };

        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO notifications (id, user_id, type, title, message, read, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                record.id,
                record.user,
                record.kind,
                record.title,
                record.message,
                format_ts(&record.created_at),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert notification: {}", e)))?;

        Ok(record)
    }

    async fn list_notifications(
        &self,
        user: &RecordId,
        cursor: Option<&RecordId>,
        limit: usize,
    ) -> StorageResult<CursorPage<Notification>> {
        let mut sql = format!(
            "SELECT {} FROM notifications WHERE user_id = ?",
            NOTIFICATION_COLUMNS
        );
        let mut values = vec![Value::Text(user.to_string())];
        if let Some(cursor) = cursor {
            sql.push_str(" AND id < ?");
            values.push(Value::Text(cursor.to_string()));
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");
        values.push(Value::Integer(limit as i64 + 1));

        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare notifications: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_notification)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to list notifications: {}", e)))?;

        Ok(CursorPage::from_overfetch(rows, limit, |n| &n.id))
    }

    async fn unread_count(&self, user: &RecordId) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND read = 0",
                [user],
                |row| row.get(0),
            )
            .map_err(|e| internal_error(format!("Failed to count notifications: {}", e)))?;
        Ok(count.max(0) as u64)
    }

    async fn mark_read(
        &self,
        user: &RecordId,
        id: &RecordId,
    ) -> StorageResult<Option<Notification>> {
        let conn = self.get_connection()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                params![id, user],
            )
            .map_err(|e| internal_error(format!("Failed to mark notification read: {}", e)))?;
        if changed == 0 {
            return Ok(None);
        }

        conn.query_row(
            &format!(
                "SELECT {} FROM notifications WHERE id = ?1",
                NOTIFICATION_COLUMNS
            ),
            [id],
            map_notification,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read notification: {}", e)))
    }

    async fn mark_all_read(&self, user: &RecordId) -> StorageResult<u64> {
        let conn = self.get_connection()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
                [user],
            )
            .map_err(|e| internal_error(format!("Failed to mark notifications read: {}", e)))?;
        Ok(changed as u64)
    }
}
