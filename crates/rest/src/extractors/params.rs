//! Lenient query string extractor.
//!
//! Paging parameters never fail a request: malformed values fall back to
//! their defaults.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use erx_persistence::types::{RecordId, resolve_cursor, resolve_limit};

/// Query string parameters as raw strings.
///
/// # Example
///
/// ```rust,ignore
/// use erx_rest::extractors::QueryParams;
///
/// async fn list_handler(params: QueryParams) {
///     let limit = params.limit(10, 50);
///     let cursor = params.cursor();
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    /// Creates parameters from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns a parameter, treating blank values as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Returns a trimmed owned parameter.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|v| v.trim().to_string())
    }

    /// The `limit` parameter, defaulted and capped.
    pub fn limit(&self, default: usize, max: usize) -> usize {
        resolve_limit(self.get("limit"), default, max)
    }

    /// The `cursor` parameter, ignored when malformed.
    pub fn cursor(&self) -> Option<RecordId> {
        resolve_cursor(self.get("cursor"))
    }

    /// A non-negative integer parameter, defaulted when absent or malformed.
    pub fn number(&self, name: &str, default: usize) -> usize {
        self.get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// The 1-based `page` parameter.
    pub fn page(&self) -> usize {
        self.number("page", 1).max(1)
    }
}

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let values = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(values)| values)
            .unwrap_or_default();
        Ok(Self { values })
    }
}
