//! [`UserStorage`] for SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params, params_from_iter, types::Value};

use crate::core::UserStorage;
use crate::error::{ResourceError, StorageError, StorageResult};
use crate::types::{NewUser, OffsetPage, ProfileUpdate, RecordId, Role, User, UserQuery};

use super::SqliteBackend;
use super::sql::{contains_pattern, format_ts, internal_error, ts_column};

const USER_COLUMNS: &str =
    "id, name, email, phone, password_hash, role, profile_picture, created_at, updated_at";

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        profile_picture: row.get(6)?,
        created_at: ts_column(row, 7)?,
        updated_at: ts_column(row, 8)?,
    })
}

impl SqliteBackend {
    fn query_user(&self, predicate: &str, value: &str) -> StorageResult<Option<User>> {
        let conn = self.get_connection()?;
        let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, predicate);
        conn.query_row(&sql, [value], map_user)
            .optional()
            .map_err(|e| internal_error(format!("Failed to read user: {}", e)))
    }

    fn require_user(&self, id: &RecordId) -> StorageResult<User> {
        self.query_user("id", id.as_str())?
            .ok_or_else(|| StorageError::not_found("User", id.as_str()))
    }
}

#[async_trait]
impl UserStorage for SqliteBackend {
    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let conn = self.get_connection()?;
        let id = self.next_id();
        let now = Utc::now();
        let created_at = id.timestamp();
        let email = user.email.trim().to_ascii_lowercase();

        let result = conn.execute(
            "INSERT INTO users (id, name, email, phone, password_hash, role, profile_picture, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, ?8)",
            params![
                id,
                user.name,
                email,
                user.phone,
                user.password_hash,
                user.role,
                format_ts(&created_at),
                format_ts(&now),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StorageError::Resource(ResourceError::AlreadyExists {
                    resource_type: "User".to_string(),
                    key: email,
                }));
            }
            Err(e) => return Err(internal_error(format!("Failed to insert user: {}", e))),
        }

        Ok(User {
            id,
            name: user.name,
            email,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            profile_picture: None,
            created_at,
            updated_at: now,
        })
    }

    async fn find_user(&self, id: &RecordId) -> StorageResult<Option<User>> {
        self.query_user("id", id.as_str())
    }

    async fn find_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        self.query_user("email", email.trim())
    }

    async fn find_user_by_phone(&self, phone: &str) -> StorageResult<Option<User>> {
        self.query_user("phone", phone.trim())
    }

    async fn update_profile(&self, id: &RecordId, update: ProfileUpdate) -> StorageResult<User> {
        let mut user = self.require_user(id)?;
        if update.is_empty() {
            return Ok(user);
        }

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(picture) = update.profile_picture {
            user.profile_picture = Some(picture);
        }
        user.updated_at = Utc::now();

        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE users SET name = ?1, phone = ?2, profile_picture = ?3, updated_at = ?4 WHERE id = ?5",
            params![
                user.name,
                user.phone,
                user.profile_picture,
                format_ts(&user.updated_at),
                user.id,
            ],
        )
        .map_err(|e| internal_error(format!("Failed to update user: {}", e)))?;

        Ok(user)
    }

    async fn set_role(&self, id: &RecordId, role: Role) -> StorageResult<User> {
        let mut user = self.require_user(id)?;
        user.role = role;
        user.updated_at = Utc::now();

        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE users SET role = ?1, updated_at = ?2 WHERE id = ?3",
            params![user.role, format_ts(&user.updated_at), user.id],
        )
        .map_err(|e| internal_error(format!("Failed to update role: {}", e)))?;

        Ok(user)
    }

    async fn delete_user(&self, id: &RecordId) -> StorageResult<()> {
        let conn = self.get_connection()?;
        let deleted = conn
            .execute("DELETE FROM users WHERE id = ?1", [id])
            .map_err(|e| internal_error(format!("Failed to delete user: {}", e)))?;

        if deleted == 0 {
            return Err(StorageError::not_found("User", id.as_str()));
        }
        Ok(())
    }

    async fn list_users(&self, query: &UserQuery) -> StorageResult<OffsetPage<User>> {
        let conn = self.get_connection()?;

        let mut conditions: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push("(name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')");
            let pattern = contains_pattern(search.trim());
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        if let Some(role) = query.role {
            conditions.push("role = ?");
            values.push(Value::Text(role.as_str().to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let total: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM users {}", where_clause),
                params_from_iter(values.iter()),
                |row| row.get(0),
            )
            .map_err(|e| internal_error(format!("Failed to count users: {}", e)))?;

        let limit = query.limit.max(1);
        let offset = OffsetPage::<User>::offset_of(query.page, limit);
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));

        let sql = format!(
            "SELECT {} FROM users {} ORDER BY id DESC LIMIT ? OFFSET ?",
            USER_COLUMNS, where_clause
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare user listing: {}", e)))?;
        let users = stmt
            .query_map(params_from_iter(values.iter()), map_user)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to list users: {}", e)))?;

        Ok(OffsetPage::new(users, total.max(0) as u64, query.page.max(1), limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            password_hash: "hash".to_string(),
            role: Role::Doctor,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let backend = create_test_backend();
        let created = backend
            .create_user(new_user("Ada", "Ada@Example.com"))
            .await
            .unwrap();
        assert_eq!(created.email, "ada@example.com");

        let by_id = backend.find_user(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Ada");
        assert_eq!(by_id.password_hash, "hash");

        let by_email = backend
            .find_user_by_email("ADA@example.com")
            .await
            .unwrap();
        assert!(by_email.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let backend = create_test_backend();
        backend
            .create_user(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();
        let err = backend
            .create_user(new_user("Other", "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Resource(ResourceError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_profile_and_role() {
        let backend = create_test_backend();
        let user = backend
            .create_user(new_user("Ada", "ada@example.com"))
            .await
            .unwrap();

        let updated = backend
            .update_profile(
                &user.id,
                ProfileUpdate {
                    phone: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.name, "Ada");

        let admin = backend.set_role(&user.id, Role::Admin).await.unwrap();
        assert_eq!(admin.role, Role::Admin);
        let reloaded = backend.find_user_by_phone("555-0100").await.unwrap().unwrap();
        assert_eq!(reloaded.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let backend = create_test_backend();
        let ghost = backend.next_id();
        assert!(backend.delete_user(&ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_users_filters_and_pages() {
        let backend = create_test_backend();
        for i in 0..5 {
            backend
                .create_user(new_user(&format!("Doctor {}", i), &format!("d{}@example.com", i)))
                .await
                .unwrap();
        }
        let pharmacist = backend
            .create_user(new_user("Phil", "phil@pharmacy.test"))
            .await
            .unwrap();
        backend
            .set_role(&pharmacist.id, Role::Pharmacist)
            .await
            .unwrap();

        let page = backend
            .list_users(&UserQuery {
                search: Some("doctor".to_string()),
                page: 2,
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.data.len(), 2);

        let pharmacists = backend
            .list_users(&UserQuery {
                role: Some(Role::Pharmacist),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pharmacists.data.len(), 1);
        assert_eq!(pharmacists.data[0].name, "Phil");
    }
}
