//! Pagination and listing query types.
//!
//! Two pagination styles are used:
//!
//! - [`CursorPage`] for prescriptions and notifications. The cursor is the id
//!   of the last record returned; because [`RecordId`]s sort in insertion
//!   order, the next page is simply everything on the far side of it.
//! - [`OffsetPage`] for admin listings where a total count and page numbers
//!   are wanted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::SearchError;

use super::{PrescriptionStatus, RecordId};

/// Default page size for prescription listings.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size accepted by cursor listings.
pub const MAX_PAGE_SIZE: usize = 50;

/// Resolves a raw `limit` parameter.
///
/// Missing, malformed or zero values fall back to `default`; larger values are
/// capped at `max`. Never fails.
pub fn resolve_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    match raw.and_then(|s| s.trim().parse::<usize>().ok()) {
        Some(0) | None => default.min(max),
        Some(n) => n.min(max),
    }
}

/// Resolves a raw `cursor` parameter. Malformed cursors are treated as absent.
pub fn resolve_cursor(raw: Option<&str>) -> Option<RecordId> {
    raw.and_then(RecordId::parse)
}

/// Ordering of a cursor listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Most recent first.
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
}

impl SortDirection {
    /// Parses a raw `sort` parameter; anything other than `oldest` means newest.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("oldest") => SortDirection::Oldest,
            _ => SortDirection::Newest,
        }
    }

    /// SQL keyword for this direction.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            SortDirection::Newest => "DESC",
            SortDirection::Oldest => "ASC",
        }
    }

    /// Comparison operator selecting records beyond a cursor.
    pub fn cursor_operator(&self) -> &'static str {
        match self {
            SortDirection::Newest => "<",
            SortDirection::Oldest => ">",
        }
    }
}

/// Pagination block of a cursor page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorInfo {
    /// Whether records remain past `next_cursor`.
    pub has_more: bool,
    /// Id of the last record in `data` when `has_more` is true.
    pub next_cursor: Option<RecordId>,
    /// The effective page size.
    pub limit: usize,
}

/// A page of a cursor listing.
#[derive(Debug, Clone, Serialize)]
pub struct CursorPage<T> {
    /// Records in this page.
    pub data: Vec<T>,
    /// Continuation information.
    pub pagination: CursorInfo,
}

impl<T> CursorPage<T> {
    /// Builds a page from a query that fetched up to `limit + 1` rows.
    ///
    /// The extra row only signals that another page exists; it is dropped and
    /// the cursor points at the last row that is kept.
    pub fn from_overfetch<F>(mut rows: Vec<T>, limit: usize, id_of: F) -> Self
    where
        F: Fn(&T) -> &RecordId,
    {
        let has_more = rows.len() > limit;
        if has_more {
            rows.truncate(limit);
        }
        let next_cursor = if has_more {
            rows.last().map(|row| id_of(row).clone())
        } else {
            None
        };

        Self {
            data: rows,
            pagination: CursorInfo {
                has_more,
                next_cursor,
                limit,
            },
        }
    }

    /// Maps the records, keeping the pagination block.
    pub fn map<U, F>(self, f: F) -> CursorPage<U>
    where
        F: FnMut(T) -> U,
    {
        CursorPage {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Pagination block of an offset page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OffsetInfo {
    /// 1-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// Total matching records.
    pub total: u64,
    /// Number of pages.
    pub pages: u64,
}

/// A page of an offset listing.
#[derive(Debug, Clone, Serialize)]
pub struct OffsetPage<T> {
    /// Records in this page.
    pub data: Vec<T>,
    /// Position information.
    pub pagination: OffsetInfo,
}

impl<T> OffsetPage<T> {
    /// Creates a page, deriving the page count from `total` and `limit`.
    pub fn new(data: Vec<T>, total: u64, page: usize, limit: usize) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit as u64)
        };
        Self {
            data,
            pagination: OffsetInfo {
                page,
                limit,
                total,
                pages,
            },
        }
    }

    /// Row offset of a 1-based page.
    pub fn offset_of(page: usize, limit: usize) -> usize {
        page.saturating_sub(1).saturating_mul(limit)
    }
}

/// Filters applied to a prescription listing. All filters intersect.
#[derive(Debug, Clone, Default)]
pub struct PrescriptionFilter {
    /// Restrict to one doctor's records.
    pub doctor: Option<RecordId>,
    /// Case-insensitive substring over patient name or diagnosis.
    pub search: Option<String>,
    /// Restrict to one status.
    pub status: Option<PrescriptionStatus>,
    /// Inclusive lower bound on `createdAt`, as supplied by the caller.
    pub from: Option<String>,
    /// Inclusive upper bound on `createdAt`, as supplied by the caller.
    pub to: Option<String>,
}

/// A cursor listing request for prescriptions.
#[derive(Debug, Clone)]
pub struct PrescriptionQuery {
    /// Filters.
    pub filter: PrescriptionFilter,
    /// Id of the last record of the previous page.
    pub cursor: Option<RecordId>,
    /// Page size.
    pub limit: usize,
    /// Ordering.
    pub sort: SortDirection,
}

impl Default for PrescriptionQuery {
    fn default() -> Self {
        Self {
            filter: PrescriptionFilter::default(),
            cursor: None,
            limit: DEFAULT_PAGE_SIZE,
            sort: SortDirection::Newest,
        }
    }
}

/// Parses a date bound supplied by a client.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` timestamps (taken
/// as UTC) and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date_bound(value: &str) -> Result<DateTime<Utc>, SearchError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(SearchError::InvalidDateBound {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u64) -> RecordId {
        RecordId::parse(&format!("{:016x}00000000", n)).unwrap()
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None, 10, 50), 10);
        assert_eq!(resolve_limit(Some("abc"), 10, 50), 10);
        assert_eq!(resolve_limit(Some("0"), 10, 50), 10);
        assert_eq!(resolve_limit(Some("-3"), 10, 50), 10);
        assert_eq!(resolve_limit(Some("25"), 10, 50), 25);
        assert_eq!(resolve_limit(Some("500"), 10, 50), 50);
    }

    #[test]
    fn test_resolve_cursor_ignores_garbage() {
        assert!(resolve_cursor(Some("not-a-cursor")).is_none());
        assert_eq!(resolve_cursor(Some(id(7).as_str())), Some(id(7)));
    }

    #[test]
    fn test_sort_direction_lenient() {
        assert_eq!(SortDirection::parse_lenient(None), SortDirection::Newest);
        assert_eq!(SortDirection::parse_lenient(Some("oldest")), SortDirection::Oldest);
        assert_eq!(SortDirection::parse_lenient(Some("sideways")), SortDirection::Newest);
    }

    #[test]
    fn test_overfetch_sets_cursor_to_last_kept() {
        let rows: Vec<RecordId> = (1..=11).map(id).collect();
        let page = CursorPage::from_overfetch(rows, 10, |r| r);
        assert_eq!(page.data.len(), 10);
        assert!(page.pagination.has_more);
        assert_eq!(page.pagination.next_cursor, Some(id(10)));
    }

    #[test]
    fn test_exact_fit_has_no_more() {
        let rows: Vec<RecordId> = (1..=10).map(id).collect();
        let page = CursorPage::from_overfetch(rows, 10, |r| r);
        assert!(!page.pagination.has_more);
        assert!(page.pagination.next_cursor.is_none());
    }

    #[test]
    fn test_offset_page_count() {
        let page = OffsetPage::new(vec![1, 2], 41, 3, 20);
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(OffsetPage::<()>::offset_of(3, 20), 40);
        assert_eq!(OffsetPage::<()>::offset_of(0, 20), 0);
    }

    #[test]
    fn test_parse_date_bound_formats() {
        let day = parse_date_bound("2024-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(parse_date_bound("2024-03-01T10:00:00Z").is_ok());
        assert!(parse_date_bound("2024-03-01T10:00:00").is_ok());
        assert!(matches!(
            parse_date_bound("yesterday"),
            Err(SearchError::InvalidDateBound { .. })
        ));
    }
}
