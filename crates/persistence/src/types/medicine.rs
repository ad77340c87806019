//! Medicine catalog entries.

// Struct fields mirror the JSON wire format and are self-describing
#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::RecordId;

/// A catalog entry. The catalog is read-mostly and is the target of search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: RecordId,
    pub name: String,
    pub composition: Option<String>,
    pub price: Option<f64>,
    pub manufacturer: Option<String>,
    /// Medicine system (allopathy, ayurvedic, homeopathy, ...).
    #[serde(rename = "type")]
    pub medicine_type: String,
    pub description: Option<String>,
    #[serde(rename = "side_effects")]
    pub side_effects: Option<String>,
    #[serde(rename = "drug_interactions")]
    pub drug_interactions: Option<String>,
    pub packaging: Option<String>,
    pub is_discontinued: bool,
}

/// Input for inserting a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedicine {
    pub name: String,
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(rename = "type", default = "default_medicine_type")]
    pub medicine_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "side_effects", default)]
    pub side_effects: Option<String>,
    #[serde(rename = "drug_interactions", default)]
    pub drug_interactions: Option<String>,
    #[serde(default)]
    pub packaging: Option<String>,
    #[serde(default)]
    pub is_discontinued: bool,
}

fn default_medicine_type() -> String {
    "allopathy".to_string()
}

impl NewMedicine {
    /// Creates an entry with only a name, using defaults for everything else.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            composition: None,
            price: None,
            manufacturer: None,
            medicine_type: default_medicine_type(),
            description: None,
            side_effects: None,
            drug_interactions: None,
            packaging: None,
            is_discontinued: false,
        }
    }

    /// Sets the composition.
    pub fn with_composition(mut self, composition: impl Into<String>) -> Self {
        self.composition = Some(composition.into());
        self
    }

    /// Sets the manufacturer.
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// Partial update of a catalog entry. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineUpdate {
    pub price: Option<f64>,
    pub description: Option<String>,
    #[serde(rename = "side_effects")]
    pub side_effects: Option<String>,
    pub packaging: Option<String>,
    pub is_discontinued: Option<bool>,
}

impl MedicineUpdate {
    /// Returns true when no field would change.
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.description.is_none()
            && self.side_effects.is_none()
            && self.packaging.is_none()
            && self.is_discontinued.is_none()
    }
}

/// A page of the catalog in offset mode.
#[derive(Debug, Clone, Serialize)]
pub struct MedicineList {
    pub data: Vec<Medicine>,
    pub total: u64,
    pub limit: usize,
    pub skip: usize,
}

/// Which strategy produced a catalog search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// The query was shorter than the minimum length; nothing was searched.
    QueryTooShort,
    /// Results come from the relevance-ranked full-text index.
    FullText,
    /// Results come from the literal substring fallback.
    Substring,
}

/// Result of a catalog search.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSearch {
    pub medicines: Vec<Medicine>,
    pub strategy: SearchStrategy,
}

impl CatalogSearch {
    /// Message attached to responses for queries below the minimum length.
    pub const TOO_SHORT_NOTICE: &'static str = "Search query too short";

    /// An empty result for a query below the minimum length.
    pub fn too_short() -> Self {
        Self {
            medicines: Vec::new(),
            strategy: SearchStrategy::QueryTooShort,
        }
    }

    /// Returns the user-facing notice, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self.strategy {
            SearchStrategy::QueryTooShort => Some(Self::TOO_SHORT_NOTICE),
            _ => None,
        }
    }
}
