//! Medicine catalog access and search.
//!
//! Catalog search runs in two stages. A relevance-ranked full-text search is
//! tried first; if it fails (for example because the text index is missing)
//! or finds nothing, a literal substring match over the raw query serves the
//! request instead. The policy lives in the provided
//! [`MedicineCatalog::search_medicines`] so every backend gets it for free and
//! only has to supply the two primitive searches.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::types::{
    CatalogSearch, Medicine, MedicineList, MedicineUpdate, NewMedicine, RecordId, SearchStrategy,
};

/// Queries whose trimmed length is below this are not searched.
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

/// Default cap on catalog search results.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Trims a search query and collapses inner whitespace runs to one space.
///
/// [`MedicineCatalog::search_medicines`] searches with this form, so callers
/// keying caches by query must key by it too.
pub fn normalize_search_query(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The medicine catalog.
#[async_trait]
pub trait MedicineCatalog: Send + Sync {
    /// Inserts a batch of entries in one transaction, returning how many were written.
    async fn insert_medicines(&self, medicines: Vec<NewMedicine>) -> StorageResult<usize>;

    /// Reads an entry by id.
    async fn get_medicine(&self, id: &RecordId) -> StorageResult<Option<Medicine>>;

    /// Lists entries in natural order with offset pagination.
    async fn list_medicines(&self, limit: usize, skip: usize) -> StorageResult<MedicineList>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// * `StorageError::Resource(NotFound)` - If the entry does not exist
    async fn update_medicine(&self, id: &RecordId, update: MedicineUpdate)
    -> StorageResult<Medicine>;

    /// Relevance-ranked full-text search over name, composition, description
    /// and manufacturer.
    ///
    /// # Errors
    ///
    /// * `StorageError::Search(TextSearchNotAvailable)` - If the text index is absent
    async fn text_search(&self, query: &str, limit: usize) -> StorageResult<Vec<Medicine>>;

    /// Case-insensitive literal substring match over name, composition and
    /// manufacturer, in natural order. Pattern metacharacters in `query` match
    /// themselves.
    async fn substring_search(&self, query: &str, limit: usize) -> StorageResult<Vec<Medicine>>;

    /// Searches the catalog, falling back from full-text to substring matching.
    ///
    /// The query is normalized with [`normalize_search_query`] first.
    /// Queries shorter than [`MIN_SEARCH_QUERY_LEN`] after that return an
    /// empty result tagged with a notice. Only a failure of the substring
    /// stage is an error.
    async fn search_medicines(&self, query: &str, limit: usize) -> StorageResult<CatalogSearch> {
        let query = normalize_search_query(query);
        if query.chars().count() < MIN_SEARCH_QUERY_LEN {
            return Ok(CatalogSearch::too_short());
        }
        let query = query.as_str();

        match self.text_search(query, limit).await {
            Ok(medicines) if !medicines.is_empty() => {
                return Ok(CatalogSearch {
                    medicines,
                    strategy: SearchStrategy::FullText,
                });
            }
            Ok(_) => debug!(query, "Full-text search found nothing, using substring match"),
            Err(e) => warn!(error = %e, "Full-text search failed, using substring match"),
        }

        let medicines = self.substring_search(query, limit).await?;
        Ok(CatalogSearch {
            medicines,
            strategy: SearchStrategy::Substring,
        })
    }
}
