//! Bulk loading of the medicine catalog from CSV.
//!
//! The expected layout is the public Indian medicine dataset, one product
//! per row:
//!
//! ```text
//! product_name,salt_composition,product_price,product_manufacturer,medicine_desc,side_effects,drug_interactions,pack_size_label
//! ```
//!
//! Extra columns are ignored and missing ones are treated as empty. Rows
//! without a product name are skipped.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::MedicineCatalog;
use crate::error::{StorageError, StorageResult};
use crate::types::NewMedicine;

/// Rows inserted per transaction.
pub const IMPORT_BATCH_SIZE: usize = 1000;

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Rows read from the file.
    pub rows_read: usize,
    /// Entries written to the catalog.
    pub inserted: usize,
    /// Rows dropped for lacking a product name.
    pub skipped: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    product_name: Option<String>,
    salt_composition: Option<String>,
    product_price: Option<String>,
    product_manufacturer: Option<String>,
    medicine_desc: Option<String>,
    side_effects: Option<String>,
    drug_interactions: Option<String>,
    pack_size_label: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses prices such as `217.5` or `₹1,217.50`.
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().ok()
}

impl CsvRow {
    fn into_medicine(self) -> Option<NewMedicine> {
        let name = non_empty(self.product_name)?;
        let mut medicine = NewMedicine::named(name);
        medicine.composition = non_empty(self.salt_composition);
        medicine.price = self.product_price.as_deref().and_then(parse_price);
        medicine.manufacturer = non_empty(self.product_manufacturer);
        medicine.description = non_empty(self.medicine_desc);
        medicine.side_effects = non_empty(self.side_effects);
        medicine.drug_interactions = non_empty(self.drug_interactions);
        medicine.packaging = non_empty(self.pack_size_label);
        Some(medicine)
    }
}

/// Imports a CSV file into the catalog.
pub async fn import_medicines_csv<C>(
    catalog: &C,
    path: impl AsRef<Path>,
) -> StorageResult<ImportReport>
where
    C: MedicineCatalog + ?Sized,
{
    let path = path.as_ref();
    info!(path = %path.display(), "Importing medicine catalog");
    let file = std::fs::File::open(path)
        .map_err(|e| StorageError::invalid("path", format!("cannot open {}: {}", path.display(), e)))?;
    import_medicines(catalog, file).await
}

/// Imports CSV data from any reader into the catalog.
pub async fn import_medicines<C, R>(catalog: &C, reader: R) -> StorageResult<ImportReport>
where
    C: MedicineCatalog + ?Sized,
    R: Read,
{
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut report = ImportReport::default();
    let mut batch = Vec::with_capacity(IMPORT_BATCH_SIZE);

    for row in csv.deserialize::<CsvRow>() {
        let row = row?;
        report.rows_read += 1;
        match row.into_medicine() {
            Some(medicine) => batch.push(medicine),
            None => report.skipped += 1,
        }

        if batch.len() >= IMPORT_BATCH_SIZE {
            report.inserted += catalog.insert_medicines(std::mem::take(&mut batch)).await?;
            debug!(inserted = report.inserted, "Imported batch");
        }
    }

    if !batch.is_empty() {
        report.inserted += catalog.insert_medicines(batch).await?;
    }

    info!(
        rows = report.rows_read,
        inserted = report.inserted,
        skipped = report.skipped,
        "Medicine import complete"
    );
    Ok(report)
}
