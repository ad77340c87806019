//! [`PrescriptionStorage`] for SQLite.
//!
//! Listing uses keyset pagination: rows are ordered by `(created_at, id)` and
//! the cursor is compared against `id`. Since `created_at` is derived from the
//! id itself, the two orderings agree and a cursor always splits the result
//! set cleanly, even if the record it names has since been removed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params, params_from_iter, types::Value};

use crate::core::PrescriptionStorage;
use crate::error::{StorageError, StorageResult, ValidationError};
use crate::types::{
    CursorPage, DailyCount, DiagnosisCount, NewPrescription, Prescription, PrescriptionQuery,
    PrescriptionStats, PrescriptionStatus, PrescriptionView, RecordId, UserSummary,
    parse_date_bound,
};

use super::SqliteBackend;
use super::sql::{contains_pattern, format_ts, internal_error, json_column, ts_column};

const PRESCRIPTION_COLUMNS: &str = "p.id, p.patient_name, p.patient_age, p.patient_email, \
     p.doctor_id, p.medicines, p.diagnosis, p.doctor_notes, p.status, p.created_at, p.updated_at";

/// Number of rows in the dashboard's diagnosis and recent lists.
const STATS_TOP_N: i64 = 5;

fn map_prescription(row: &Row<'_>) -> rusqlite::Result<Prescription> {
    Ok(Prescription {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        patient_age: row.get(2)?,
        patient_email: row.get(3)?,
        doctor: row.get(4)?,
        medicines: json_column(row, 5)?,
        diagnosis: row.get(6)?,
        doctor_notes: row.get(7)?,
        status: row.get(8)?,
        created_at: ts_column(row, 9)?,
        updated_at: ts_column(row, 10)?,
    })
}

/// Maps a prescription row followed by `u.id, u.name, u.email, u.role` from a
/// left join on users.
fn map_prescription_view(row: &Row<'_>) -> rusqlite::Result<PrescriptionView> {
    let prescription = map_prescription(row)?;
    let doctor_id: Option<RecordId> = row.get(11)?;
    let doctor = match doctor_id {
        Some(id) => Some(UserSummary {
            id,
            name: row.get(12)?,
            email: row.get(13)?,
            role: row.get(14)?,
        }),
        None => None,
    };
    Ok(prescription.with_doctor(doctor))
}

impl SqliteBackend {
    fn read_prescription(&self, id: &RecordId) -> StorageResult<Option<Prescription>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM prescriptions p WHERE p.id = ?1",
                PRESCRIPTION_COLUMNS
            ),
            [id],
            map_prescription,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read prescription: {}", e)))
    }
}

#[async_trait]
impl PrescriptionStorage for SqliteBackend {
    async fn create_prescription(
        &self,
        doctor: &RecordId,
        prescription: NewPrescription,
    ) -> StorageResult<Prescription> {
        let patient_age =
            prescription
                .patient_age
                .ok_or_else(|| ValidationError::MissingRequiredField {
                    field: "patientAge".to_string(),
                })?;

        let id = self.next_id();
        let created_at = id.timestamp();
        let record = Prescription {
            id,
            patient_name: prescription.patient_name.trim().to_string(),
            patient_age,
            patient_email: prescription.patient_email,
            doctor: doctor.clone(),
            medicines: prescription.medicines,
            diagnosis: prescription.diagnosis.trim().to_string(),
            doctor_notes: prescription.doctor_notes,
            status: PrescriptionStatus::Active,
            created_at,
            updated_at: created_at,
        };
        let medicines_json = serde_json::to_string(&record.medicines)?;

        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO prescriptions (id, patient_name, patient_age, patient_email, doctor_id,
                medicines, diagnosis, doctor_notes, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                record.id,
                record.patient_name,
                record.patient_age,
                record.patient_email,
                record.doctor,
                medicines_json,
                record.diagnosis,
                record.doctor_notes,
                record.status,
                format_ts(&record.created_at),
            ],
        )
        .map_err(|e| internal_error(format!("Failed to insert prescription: {}", e)))?;

        Ok(record)
    }

    async fn get_prescription(&self, id: &RecordId) -> StorageResult<Option<Prescription>> {
        self.read_prescription(id)
    }

    async fn set_prescription_status(
        &self,
        id: &RecordId,
        status: PrescriptionStatus,
    ) -> StorageResult<Prescription> {
        let now = Utc::now();
        {
            let conn = self.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE prescriptions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status, format_ts(&now), id],
                )
                .map_err(|e| internal_error(format!("Failed to update status: {}", e)))?;
            if changed == 0 {
                return Err(StorageError::not_found("Prescription", id.as_str()));
            }
        }

        self.read_prescription(id)?
            .ok_or_else(|| StorageError::not_found("Prescription", id.as_str()))
    }

    async fn list_prescriptions(
        &self,
        query: &PrescriptionQuery,
    ) -> StorageResult<CursorPage<PrescriptionView>> {
        let filter = &query.filter;
        let mut conditions: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(doctor) = &filter.doctor {
            conditions.push("p.doctor_id = ?".to_string());
            values.push(Value::Text(doctor.to_string()));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            conditions.push(
                "(p.patient_name LIKE ? ESCAPE '\\' OR p.diagnosis LIKE ? ESCAPE '\\')".to_string(),
            );
            let pattern = contains_pattern(search);
            values.push(Value::Text(pattern.clone()));
            values.push(Value::Text(pattern));
        }
        if let Some(status) = filter.status {
            conditions.push("p.status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(from) = filter.from.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push("p.created_at >= ?".to_string());
            values.push(Value::Text(format_ts(&parse_date_bound(from)?)));
        }
        if let Some(to) = filter.to.as_deref().filter(|s| !s.trim().is_empty()) {
            conditions.push("p.created_at <= ?".to_string());
            values.push(Value::Text(format_ts(&parse_date_bound(to)?)));
        }
        if let Some(cursor) = &query.cursor {
            conditions.push(format!("p.id {} ?", query.sort.cursor_operator()));
            values.push(Value::Text(cursor.to_string()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let direction = query.sort.sql_keyword();
        values.push(Value::Integer(query.limit as i64 + 1));

        let sql = format!(
            "SELECT {cols}, u.id, u.name, u.email, u.role
             FROM prescriptions p
             LEFT JOIN users u ON u.id = p.doctor_id
             {where_clause}
             ORDER BY p.created_at {direction}, p.id {direction}
             LIMIT ?",
            cols = PRESCRIPTION_COLUMNS,
        );

        let conn = self.get_connection()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| internal_error(format!("Failed to prepare listing: {}", e)))?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), map_prescription_view)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to list prescriptions: {}", e)))?;

        Ok(CursorPage::from_overfetch(rows, query.limit, |p| &p.id))
    }

    async fn prescription_stats(
        &self,
        doctor: Option<&RecordId>,
        since: DateTime<Utc>,
    ) -> StorageResult<PrescriptionStats> {
        let (scope, scope_values) = match doctor {
            Some(d) => ("AND p.doctor_id = ?", vec![Value::Text(d.to_string())]),
            None => ("", Vec::new()),
        };
        let conn = self.get_connection()?;

        let mut daily_values = vec![Value::Text(format_ts(&since))];
        daily_values.extend(scope_values.iter().cloned());
        let mut stmt = conn
            .prepare(&format!(
                "SELECT substr(p.created_at, 1, 10) AS day, COUNT(*)
                 FROM prescriptions p
                 WHERE p.created_at >= ? {scope}
                 GROUP BY day
                 ORDER BY day ASC"
            ))
            .map_err(|e| internal_error(format!("Failed to prepare daily stats: {}", e)))?;
        let treated_stats = stmt
            .query_map(params_from_iter(daily_values.iter()), |row| {
                Ok(DailyCount {
                    date: row.get(0)?,
                    count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to compute daily stats: {}", e)))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT p.diagnosis, COUNT(*) AS n
                 FROM prescriptions p
                 WHERE p.diagnosis <> '' {scope}
                 GROUP BY p.diagnosis
                 ORDER BY n DESC, p.diagnosis ASC
                 LIMIT {STATS_TOP_N}"
            ))
            .map_err(|e| internal_error(format!("Failed to prepare diagnosis stats: {}", e)))?;
        let diagnosis_stats = stmt
            .query_map(params_from_iter(scope_values.iter()), |row| {
                Ok(DiagnosisCount {
                    diagnosis: row.get(0)?,
                    count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to compute diagnosis stats: {}", e)))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PRESCRIPTION_COLUMNS}
                 FROM prescriptions p
                 WHERE 1 = 1 {scope}
                 ORDER BY p.created_at DESC, p.id DESC
                 LIMIT {STATS_TOP_N}"
            ))
            .map_err(|e| internal_error(format!("Failed to prepare recent list: {}", e)))?;
        let recent_prescriptions = stmt
            .query_map(params_from_iter(scope_values.iter()), map_prescription)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to list recent prescriptions: {}", e)))?;

        Ok(PrescriptionStats {
            treated_stats,
            diagnosis_stats,
            recent_prescriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::core::UserStorage;
    use crate::types::{
        NewUser, PrescribedMedicine, PrescriptionFilter, Role, SortDirection, User,
    };

    fn create_test_backend() -> SqliteBackend {
        let backend = SqliteBackend::in_memory().unwrap();
        backend.init_schema().unwrap();
        backend
    }

    async fn create_doctor(backend: &SqliteBackend, email: &str) -> User {
        backend
            .create_user(NewUser {
                name: format!("Dr {}", email),
                email: email.to_string(),
                phone: None,
                password_hash: "hash".to_string(),
                role: Role::Doctor,
            })
            .await
            .unwrap()
    }

    fn new_prescription(patient: &str, diagnosis: &str) -> NewPrescription {
        NewPrescription {
            patient_name: patient.to_string(),
            patient_age: Some(40),
            patient_email: None,
            medicines: vec![PrescribedMedicine {
                name: "Paracetamol".to_string(),
                composition: None,
                dosage: Some("500mg".to_string()),
                frequency: Some("1-0-1".to_string()),
                duration: Some("5 days".to_string()),
                quantity: Some(10),
                price: None,
            }],
            diagnosis: diagnosis.to_string(),
            doctor_notes: None,
        }
    }

    fn query_for(doctor: Option<&RecordId>, limit: usize) -> PrescriptionQuery {
        PrescriptionQuery {
            filter: PrescriptionFilter {
                doctor: doctor.cloned(),
                ..Default::default()
            },
            limit,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;

        let created = backend
            .create_prescription(&doctor.id, new_prescription("Jane Doe", "Flu"))
            .await
            .unwrap();
        assert_eq!(created.status, PrescriptionStatus::Active);
        assert_eq!(created.doctor, doctor.id);

        let read = backend.get_prescription(&created.id).await.unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(read.medicines[0].dosage.as_deref(), Some("500mg"));
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_doctor() {
        let backend = create_test_backend();
        let a = create_doctor(&backend, "a@example.com").await;
        let b = create_doctor(&backend, "b@example.com").await;

        backend
            .create_prescription(&a.id, new_prescription("Jane Doe", "Flu"))
            .await
            .unwrap();

        let for_b = backend.list_prescriptions(&query_for(Some(&b.id), 10)).await.unwrap();
        assert!(for_b.data.is_empty());

        let for_admin = backend.list_prescriptions(&query_for(None, 10)).await.unwrap();
        assert_eq!(for_admin.data.len(), 1);
        assert_eq!(for_admin.data[0].patient_name, "Jane Doe");
        let joined = for_admin.data[0].doctor.as_ref().unwrap();
        assert_eq!(joined.email, "a@example.com");
        assert_eq!(joined.role, Role::Doctor);
    }

    #[tokio::test]
    async fn test_eleven_records_page_of_ten() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        let mut ids = Vec::new();
        for i in 0..11 {
            let p = backend
                .create_prescription(&doctor.id, new_prescription(&format!("Patient {}", i), "Flu"))
                .await
                .unwrap();
            ids.push(p.id);
        }
        // Newest first: the 10th record returned is the second one created.
        let first = backend.list_prescriptions(&query_for(None, 10)).await.unwrap();
        assert_eq!(first.data.len(), 10);
        assert!(first.pagination.has_more);
        assert_eq!(first.pagination.next_cursor.as_ref(), Some(&first.data[9].id));
        assert_eq!(first.data[9].id, ids[1]);

        let mut next = query_for(None, 10);
        next.cursor = first.pagination.next_cursor.clone();
        let second = backend.list_prescriptions(&next).await.unwrap();
        assert_eq!(second.data.len(), 1);
        assert_eq!(second.data[0].id, ids[0]);
        assert!(!second.pagination.has_more);
        assert!(second.pagination.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_traversal_sees_every_record_once() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        for i in 0..23 {
            backend
                .create_prescription(&doctor.id, new_prescription(&format!("P{}", i), "Cold"))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut query = query_for(None, 5);
        loop {
            let page = backend.list_prescriptions(&query).await.unwrap();
            seen.extend(page.data.iter().map(|p| p.id.clone()));
            if !page.pagination.has_more {
                break;
            }
            query.cursor = page.pagination.next_cursor.clone();
            // Newer records land on the already traversed side of the cursor.
            backend
                .create_prescription(&doctor.id, new_prescription("Late", "Cold"))
                .await
                .unwrap();
        }

        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 23);
        assert_eq!(seen.len(), 23);
        let mut sorted = seen.clone();
        sorted.sort();
        sorted.reverse();
        assert_eq!(sorted, seen);
    }

    #[tokio::test]
    async fn test_oldest_first_traversal() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        for i in 0..7 {
            backend
                .create_prescription(&doctor.id, new_prescription(&format!("P{}", i), "Cold"))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut query = query_for(None, 3);
        query.sort = SortDirection::Oldest;
        loop {
            let page = backend.list_prescriptions(&query).await.unwrap();
            seen.extend(page.data.iter().map(|p| p.patient_name.clone()));
            if !page.pagination.has_more {
                break;
            }
            query.cursor = page.pagination.next_cursor.clone();
        }

        let expected: Vec<String> = (0..7).map(|i| format!("P{}", i)).collect();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn test_filters_intersect() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        let flu = backend
            .create_prescription(&doctor.id, new_prescription("Jane Doe", "Flu"))
            .await
            .unwrap();
        backend
            .create_prescription(&doctor.id, new_prescription("John Roe", "Flu"))
            .await
            .unwrap();
        backend
            .create_prescription(&doctor.id, new_prescription("Janet 100%", "Migraine"))
            .await
            .unwrap();
        backend
            .set_prescription_status(&flu.id, PrescriptionStatus::Completed)
            .await
            .unwrap();

        let mut query = query_for(None, 10);
        query.filter.search = Some("jane".to_string());
        assert_eq!(backend.list_prescriptions(&query).await.unwrap().data.len(), 2);

        query.filter.status = Some(PrescriptionStatus::Completed);
        let page = backend.list_prescriptions(&query).await.unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, flu.id);

        let mut literal = query_for(None, 10);
        literal.filter.search = Some("100%".to_string());
        assert_eq!(backend.list_prescriptions(&literal).await.unwrap().data.len(), 1);
    }

    #[tokio::test]
    async fn test_date_bounds() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        backend
            .create_prescription(&doctor.id, new_prescription("Jane Doe", "Flu"))
            .await
            .unwrap();

        let mut query = query_for(None, 10);
        query.filter.from = Some("2000-01-01".to_string());
        assert_eq!(backend.list_prescriptions(&query).await.unwrap().data.len(), 1);

        query.filter.to = Some("2000-12-31".to_string());
        assert!(backend.list_prescriptions(&query).await.unwrap().data.is_empty());

        let mut bad = query_for(None, 10);
        bad.filter.from = Some("not-a-date".to_string());
        let err = backend.list_prescriptions(&bad).await.unwrap_err();
        assert!(matches!(err, StorageError::Search(_)));
    }

    #[tokio::test]
    async fn test_set_status_is_idempotent() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        let p = backend
            .create_prescription(&doctor.id, new_prescription("Jane Doe", "Flu"))
            .await
            .unwrap();

        let once = backend
            .set_prescription_status(&p.id, PrescriptionStatus::Cancelled)
            .await
            .unwrap();
        let twice = backend
            .set_prescription_status(&p.id, PrescriptionStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(once.status, twice.status);
        assert_eq!(twice.doctor, doctor.id);

        // Any state is reachable from any other.
        let reopened = backend
            .set_prescription_status(&p.id, PrescriptionStatus::Active)
            .await
            .unwrap();
        assert_eq!(reopened.status, PrescriptionStatus::Active);

        let missing = backend.next_id();
        assert!(
            backend
                .set_prescription_status(&missing, PrescriptionStatus::Completed)
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_deleted_cursor_is_still_a_boundary() {
        let backend = create_test_backend();
        let doctor = create_doctor(&backend, "a@example.com").await;
        for i in 0..3 {
            backend
                .create_prescription(&doctor.id, new_prescription(&format!("P{}", i), "Flu"))
                .await
                .unwrap();
        }
        let mut query = query_for(None, 10);
        query.cursor = Some(backend.next_id());
        assert_eq!(backend.list_prescriptions(&query).await.unwrap().data.len(), 3);
    }

    #[tokio::test]
    async fn test_stats_scoped_to_doctor() {
        let backend = create_test_backend();
        let a = create_doctor(&backend, "a@example.com").await;
        let b = create_doctor(&backend, "b@example.com").await;
        for diagnosis in ["Flu", "Flu", "Cold"] {
            backend
                .create_prescription(&a.id, new_prescription("Jane", diagnosis))
                .await
                .unwrap();
        }
        backend
            .create_prescription(&b.id, new_prescription("Bob", "Asthma"))
            .await
            .unwrap();

        let since = Utc::now() - chrono::Duration::days(7);
        let stats = backend.prescription_stats(Some(&a.id), since).await.unwrap();
        assert_eq!(stats.treated_stats.iter().map(|d| d.count).sum::<u64>(), 3);
        assert_eq!(stats.diagnosis_stats[0].diagnosis, "Flu");
        assert_eq!(stats.diagnosis_stats[0].count, 2);
        assert_eq!(stats.recent_prescriptions.len(), 3);

        let all = backend.prescription_stats(None, since).await.unwrap();
        assert_eq!(all.recent_prescriptions.len(), 4);
        assert_eq!(all.diagnosis_stats.len(), 3);
    }
}
