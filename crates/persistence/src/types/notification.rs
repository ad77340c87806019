//! In-app notifications.

// Struct fields mirror the JSON wire format and are self-describing
#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordId;

/// A notification addressed to one user.
///
/// Notifications are created as a side effect of other operations and only
/// ever mutated to `read = true` by their owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: RecordId,
    pub user: RecordId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user: RecordId,
    pub kind: String,
    pub title: String,
    pub message: String,
}
