//! FTS5 full-text index over the medicine catalog.
//!
//! The index is an external-content FTS5 table keyed by the catalog's integer
//! `seq` column and kept in sync by triggers. It is optional: dropping it makes
//! [`MedicineTextIndex::build_match_query`] queries fail, and catalog search
//! then serves results from substring matching.

/// FTS5 helper for the medicine catalog.
pub struct MedicineTextIndex;

impl MedicineTextIndex {
    /// The name of the FTS5 virtual table.
    pub const TABLE_NAME: &'static str = "medicines_fts";

    /// SQL creating the FTS5 virtual table.
    pub fn create_table_sql() -> &'static str {
        r#"
        CREATE VIRTUAL TABLE IF NOT EXISTS medicines_fts USING fts5(
            name,
            composition,
            description,
            manufacturer,
            content='medicines',
            content_rowid='seq',
            tokenize='unicode61'
        )
        "#
    }

    /// SQL creating the triggers that keep the index in sync with `medicines`.
    pub fn create_triggers_sql() -> &'static str {
        r#"
        CREATE TRIGGER IF NOT EXISTS medicines_fts_insert AFTER INSERT ON medicines
        BEGIN
            INSERT INTO medicines_fts(rowid, name, composition, description, manufacturer)
            VALUES (new.seq, new.name, new.composition, new.description, new.manufacturer);
        END;

        CREATE TRIGGER IF NOT EXISTS medicines_fts_delete AFTER DELETE ON medicines
        BEGIN
            INSERT INTO medicines_fts(medicines_fts, rowid, name, composition, description, manufacturer)
            VALUES ('delete', old.seq, old.name, old.composition, old.description, old.manufacturer);
        END;

        CREATE TRIGGER IF NOT EXISTS medicines_fts_update AFTER UPDATE ON medicines
        BEGIN
            INSERT INTO medicines_fts(medicines_fts, rowid, name, composition, description, manufacturer)
            VALUES ('delete', old.seq, old.name, old.composition, old.description, old.manufacturer);
            INSERT INTO medicines_fts(rowid, name, composition, description, manufacturer)
            VALUES (new.seq, new.name, new.composition, new.description, new.manufacturer);
        END;
        "#
    }

    /// SQL rebuilding the index from the content table.
    pub fn rebuild_sql() -> &'static str {
        "INSERT INTO medicines_fts(medicines_fts) VALUES ('rebuild')"
    }

    /// SQL removing the index and its triggers.
    pub fn drop_sql() -> &'static str {
        r#"
        DROP TRIGGER IF EXISTS medicines_fts_insert;
        DROP TRIGGER IF EXISTS medicines_fts_delete;
        DROP TRIGGER IF EXISTS medicines_fts_update;
        DROP TABLE IF EXISTS medicines_fts;
        "#
    }

    /// Builds an FTS5 MATCH expression from free text.
    ///
    /// Each whitespace separated term is quoted so FTS5 operators in user input
    /// are taken literally; terms are OR-ed together so that ranking, not
    /// exact co-occurrence, decides the order. Returns `None` when nothing
    /// searchable remains.
    pub fn build_match_query(text: &str) -> Option<String> {
        let terms: Vec<String> = text
            .split_whitespace()
            .map(Self::escape_term)
            .filter(|t| !t.is_empty())
            .map(|t| format!("\"{}\"", t))
            .collect();

        if terms.is_empty() {
            None
        } else {
            Some(terms.join(" OR "))
        }
    }

    /// Strips characters that would close or break a quoted FTS5 string.
    fn escape_term(term: &str) -> String {
        term.chars()
            .filter(|c| *c != '"' && !c.is_control())
            .collect()
    }
}
