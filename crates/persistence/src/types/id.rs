//! Record identifiers.
//!
//! Every stored record is keyed by a [`RecordId`]: a 24 character lowercase
//! hex string whose first 16 characters encode a process-monotonic counter
//! seeded from the wall clock (milliseconds shifted left by 16 bits). The last
//! 8 characters are random and only disambiguate ids minted by different
//! processes within the same counter value.
//!
//! Because the width is fixed, lexicographic order of the string equals
//! numeric order of the counter, which is what keyset pagination relies on:
//! `id < cursor` selects exactly the records inserted before the cursor.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const COUNTER_HEX_LEN: usize = 16;
const ID_HEX_LEN: usize = 24;
const SEQUENCE_BITS: u32 = 16;

/// Identifier of a stored record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Parses an identifier, returning `None` for anything that is not
    /// 24 hex characters.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.len() == ID_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(value.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Wraps a value read back from storage without re-validating it.
    pub fn from_storage(value: String) -> Self {
        Self(value)
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the monotonic counter encoded in the identifier.
    pub fn counter(&self) -> u64 {
        self.0
            .get(..COUNTER_HEX_LEN)
            .and_then(|prefix| u64::from_str_radix(prefix, 16).ok())
            .unwrap_or(0)
    }

    /// Returns the creation instant encoded in the identifier.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let millis = (self.counter() >> SEQUENCE_BITS) as i64;
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s).ok_or_else(|| ValidationError::InvalidField {
            field: "id".to_string(),
            message: format!("'{}' is not a valid identifier", s),
        })
    }
}

impl AsRef<str> for RecordId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Mints [`RecordId`]s that are strictly increasing within a process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: Mutex<u64>,
}

impl IdGenerator {
    /// Creates a generator with no floor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the floor so that every future id sorts after `existing`.
    ///
    /// Used at startup with the largest id already persisted, so a clock that
    /// moved backwards between runs cannot produce ids that sort before old ones.
    pub fn observe(&self, existing: &RecordId) {
        let mut last = self.last.lock();
        *last = (*last).max(existing.counter());
    }

    /// Returns the next identifier.
    pub fn next_id(&self) -> RecordId {
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        let candidate = now_ms << SEQUENCE_BITS;

        let counter = {
            let mut last = self.last.lock();
            let next = if candidate > *last { candidate } else { *last + 1 };
            *last = next;
            next
        };

        let tail = uuid::Uuid::new_v4();
        let bytes = tail.as_bytes();
        RecordId(format!(
            "{:016x}{:02x}{:02x}{:02x}{:02x}",
            counter, bytes[0], bytes[1], bytes[2], bytes[3]
        ))
    }
}
