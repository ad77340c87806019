//! Append-only audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::{RecordId, UserSummary};

/// Default retention window for audit entries.
pub const DEFAULT_AUDIT_RETENTION_DAYS: u32 = 90;

/// Actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum AuditAction {
    UserSignup,
    UserLogin,
    UserLoginFailed,
    PrescriptionCreated,
    PrescriptionUpdated,
    PrescriptionDeleted,
    PrescriptionEmailed,
    ProfileUpdated,
    ProfilePictureUploaded,
    UserRoleChanged,
    UserDeleted,
    MedicineSearched,
}

impl AuditAction {
    /// Every action, in declaration order.
    pub const ALL: [AuditAction; 12] = [
        AuditAction::UserSignup,
        AuditAction::UserLogin,
        AuditAction::UserLoginFailed,
        AuditAction::PrescriptionCreated,
        AuditAction::PrescriptionUpdated,
        AuditAction::PrescriptionDeleted,
        AuditAction::PrescriptionEmailed,
        AuditAction::ProfileUpdated,
        AuditAction::ProfilePictureUploaded,
        AuditAction::UserRoleChanged,
        AuditAction::UserDeleted,
        AuditAction::MedicineSearched,
    ];

    /// Returns the stored name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserSignup => "USER_SIGNUP",
            AuditAction::UserLogin => "USER_LOGIN",
            AuditAction::UserLoginFailed => "USER_LOGIN_FAILED",
            AuditAction::PrescriptionCreated => "PRESCRIPTION_CREATED",
            AuditAction::PrescriptionUpdated => "PRESCRIPTION_UPDATED",
            AuditAction::PrescriptionDeleted => "PRESCRIPTION_DELETED",
            AuditAction::PrescriptionEmailed => "PRESCRIPTION_EMAILED",
            AuditAction::ProfileUpdated => "PROFILE_UPDATED",
            AuditAction::ProfilePictureUploaded => "PROFILE_PICTURE_UPLOADED",
            AuditAction::UserRoleChanged => "USER_ROLE_CHANGED",
            AuditAction::UserDeleted => "USER_DELETED",
            AuditAction::MedicineSearched => "MEDICINE_SEARCHED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidField {
                field: "action".to_string(),
                message: format!("unknown audit action '{}'", s),
            })
    }
}

/// Kind of resource an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum AuditResourceType {
    User,
    Prescription,
    Medicine,
    System,
}

impl AuditResourceType {
    /// Returns the stored name of the resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResourceType::User => "User",
            AuditResourceType::Prescription => "Prescription",
            AuditResourceType::Medicine => "Medicine",
            AuditResourceType::System => "System",
        }
    }
}

impl FromStr for AuditResourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(AuditResourceType::User),
            "Prescription" => Ok(AuditResourceType::Prescription),
            "Medicine" => Ok(AuditResourceType::Medicine),
            "System" => Ok(AuditResourceType::System),
            other => Err(ValidationError::InvalidField {
                field: "resourceType".to_string(),
                message: format!("unknown resource type '{}'", other),
            }),
        }
    }
}

/// An event handed to the audit sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Acting user; `None` for anonymous events such as failed logins.
    pub user: Option<RecordId>,
    /// What happened.
    pub action: AuditAction,
    /// Kind of the affected resource.
    pub resource_type: AuditResourceType,
    /// Id of the affected resource, when there is one.
    pub resource_id: Option<String>,
    /// Free-form structured details.
    pub details: serde_json::Value,
    /// Client address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

impl AuditEntry {
    /// Creates an entry with empty details and no client information.
    pub fn new(action: AuditAction, resource_type: AuditResourceType) -> Self {
        Self {
            user: None,
            action,
            resource_type,
            resource_id: None,
            details: serde_json::Value::Object(Default::default()),
            ip_address: None,
            user_agent: None,
        }
    }

    /// Sets the acting user.
    pub fn by(mut self, user: &RecordId) -> Self {
        self.user = Some(user.clone());
        self
    }

    /// Sets the affected resource id.
    pub fn on(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Sets the details payload.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Sets the client address and user agent.
    pub fn from_client(mut self, ip_address: Option<String>, user_agent: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }
}

/// A stored audit entry joined with the acting user's summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    /// Entry id.
    pub id: RecordId,
    /// Acting user id, if any.
    pub user_id: Option<RecordId>,
    /// Acting user, when the account still exists.
    pub user: Option<UserSummary>,
    /// What happened.
    pub action: AuditAction,
    /// Kind of the affected resource.
    pub resource_type: AuditResourceType,
    /// Id of the affected resource.
    pub resource_id: Option<String>,
    /// Free-form details.
    pub details: serde_json::Value,
    /// Client address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Filters for the admin audit listing.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    /// Only this action.
    pub action: Option<AuditAction>,
    /// Only this acting user.
    pub user: Option<RecordId>,
    /// Inclusive lower bound on `createdAt`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `createdAt`.
    pub to: Option<DateTime<Utc>>,
    /// 1-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
}

impl AuditQuery {
    /// Default page size.
    pub const DEFAULT_LIMIT: usize = 25;
    /// Largest accepted page size.
    pub const MAX_LIMIT: usize = 100;
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            action: None,
            user: None,
            from: None,
            to: None,
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
