//! [`MedicineCatalog`] for SQLite.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

use crate::core::MedicineCatalog;
use crate::error::{SearchError, StorageError, StorageResult};
use crate::types::{Medicine, MedicineList, MedicineUpdate, NewMedicine, RecordId};

use super::SqliteBackend;
use super::fts::MedicineTextIndex;
use super::sql::{contains_pattern, format_ts, internal_error};

const MEDICINE_COLUMNS: &str = "m.id, m.name, m.composition, m.price, m.manufacturer, m.type, \
     m.description, m.side_effects, m.drug_interactions, m.packaging, m.is_discontinued";

fn map_medicine(row: &Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        name: row.get(1)?,
        composition: row.get(2)?,
        price: row.get(3)?,
        manufacturer: row.get(4)?,
        medicine_type: row.get(5)?,
        description: row.get(6)?,
        side_effects: row.get(7)?,
        drug_interactions: row.get(8)?,
        packaging: row.get(9)?,
        is_discontinued: row.get(10)?,
    })
}

#[async_trait]
impl MedicineCatalog for SqliteBackend {
    async fn insert_medicines(&self, medicines: Vec<NewMedicine>) -> StorageResult<usize> {
        if medicines.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| internal_error(format!("Failed to begin transaction: {}", e)))?;
        let now = format_ts(&Utc::now());

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO medicines (id, name, composition, price, manufacturer, type,
                        description, side_effects, drug_interactions, packaging, is_discontinued,
                        created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)",
                )
                .map_err(|e| internal_error(format!("Failed to prepare insert: {}", e)))?;

            for medicine in &medicines {
                stmt.execute(params![
                    self.next_id(),
                    medicine.name,
                    medicine.composition,
                    medicine.price,
                    medicine.manufacturer,
                    medicine.medicine_type,
                    medicine.description,
                    medicine.side_effects,
                    medicine.drug_interactions,
                    medicine.packaging,
                    medicine.is_discontinued,
                    now,
                ])
                .map_err(|e| internal_error(format!("Failed to insert medicine: {}", e)))?;
            }
        }

        tx.commit()
            .map_err(|e| internal_error(format!("Failed to commit medicines: {}", e)))?;

        debug!(count = medicines.len(), "Inserted medicines");
        Ok(medicines.len())
    }

    async fn get_medicine(&self, id: &RecordId) -> StorageResult<Option<Medicine>> {
        let conn = self.get_connection()?;
        conn.query_row(
            &format!("SELECT {} FROM medicines m WHERE m.id = ?1", MEDICINE_COLUMNS),
            [id],
            map_medicine,
        )
        .optional()
        .map_err(|e| internal_error(format!("Failed to read medicine: {}", e)))
    }

    async fn list_medicines(&self, limit: usize, skip: usize) -> StorageResult<MedicineList> {
        let conn = self.get_connection()?;

        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM medicines", [], |row| row.get(0))
            .map_err(|e| internal_error(format!("Failed to count medicines: {}", e)))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM medicines m ORDER BY m.seq LIMIT ?1 OFFSET ?2",
                MEDICINE_COLUMNS
            ))
            .map_err(|e| internal_error(format!("Failed to prepare listing: {}", e)))?;
        let data = stmt
            .query_map(params![limit as i64, skip as i64], map_medicine)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Failed to list medicines: {}", e)))?;

        Ok(MedicineList {
            data,
            total: total.max(0) as u64,
            limit,
            skip,
        })
    }

    async fn update_medicine(
        &self,
        id: &RecordId,
        update: MedicineUpdate,
    ) -> StorageResult<Medicine> {
        let mut medicine = self
            .get_medicine(id)
            .await?
            .ok_or_else(|| StorageError::not_found("Medicine", id.as_str()))?;

        if update.is_empty() {
            return Ok(medicine);
        }
        if let Some(price) = update.price {
            medicine.price = Some(price);
        }
        if let Some(description) = update.description {
            medicine.description = Some(description);
        }
        if let Some(side_effects) = update.side_effects {
            medicine.side_effects = Some(side_effects);
        }
        if let Some(packaging) = update.packaging {
            medicine.packaging = Some(packaging);
        }
        if let Some(discontinued) = update.is_discontinued {
            medicine.is_discontinued = discontinued;
        }

        let conn = self.get_connection()?;
        conn.execute(
            "UPDATE medicines SET price = ?1, description = ?2, side_effects = ?3,
                packaging = ?4, is_discontinued = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                medicine.price,
                medicine.description,
                medicine.side_effects,
                medicine.packaging,
                medicine.is_discontinued,
                format_ts(&Utc::now()),
                medicine.id,
            ],
        )
        .map_err(|e| internal_error(format!("Failed to update medicine: {}", e)))?;

        Ok(medicine)
    }

    async fn text_search(&self, query: &str, limit: usize) -> StorageResult<Vec<Medicine>> {
        let Some(match_query) = MedicineTextIndex::build_match_query(query) else {
            return Ok(Vec::new());
        };

        let conn = self.get_connection()?;
        let sql = format!(
            "SELECT {cols} FROM {fts}
             JOIN medicines m ON m.seq = {fts}.rowid
             WHERE {fts} MATCH ?1
             ORDER BY bm25({fts}) ASC
             LIMIT ?2",
            cols = MEDICINE_COLUMNS,
            fts = MedicineTextIndex::TABLE_NAME,
        );

        let not_available = |e: rusqlite::Error| {
            StorageError::Search(SearchError::TextSearchNotAvailable {
                message: e.to_string(),
            })
        };

        let mut stmt = conn.prepare(&sql).map_err(not_available)?;
        stmt.query_map(params![match_query, limit as i64], map_medicine)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(not_available)
    }

    async fn substring_search(&self, query: &str, limit: usize) -> StorageResult<Vec<Medicine>> {
        let conn = self.get_connection()?;
        let pattern = contains_pattern(query);

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM medicines m
                 WHERE m.name LIKE ?1 ESCAPE '\\'
                    OR m.composition LIKE ?1 ESCAPE '\\'
                    OR m.manufacturer LIKE ?1 ESCAPE '\\'
                 ORDER BY m.seq
                 LIMIT ?2",
                MEDICINE_COLUMNS
            ))
            .map_err(|e| internal_error(format!("Failed to prepare substring search: {}", e)))?;

        stmt.query_map(params![pattern, limit as i64], map_medicine)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| internal_error(format!("Substring search failed: {}", e)))
    }
}
