//! User accounts and roles.

// Struct fields mirror the JSON wire format and are self-describing
#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::RecordId;

/// Role of a user account.
///
/// Roles form a closed set; authorization decisions are expressed over this
/// enum rather than over raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prescribing doctor (default for new accounts).
    #[default]
    Doctor,
    /// Pharmacist.
    Pharmacist,
    /// Administrator.
    Admin,
}

impl Role {
    /// All roles, in display order.
    pub const ALL: [Role; 3] = [Role::Doctor, Role::Pharmacist, Role::Admin];

    /// Returns the wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Pharmacist => "pharmacist",
            Role::Admin => "admin",
        }
    }

    /// Returns true for administrators.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doctor" => Ok(Role::Doctor),
            "pharmacist" => Ok(Role::Pharmacist),
            "admin" => Ok(Role::Admin),
            _ => Err(ValidationError::InvalidField {
                field: "role".to_string(),
                message: format!(
                    "Invalid role. Allowed: {}",
                    Role::ALL.map(|r| r.as_str()).join(", ")
                ),
            }),
        }
    }
}

/// A stored user account.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Returns the public projection used when joining users onto other records.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// The `{name, email, role}` projection joined onto prescriptions and audit logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: RecordId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// Self-service profile changes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub profile_picture: Option<String>,
}

impl ProfileUpdate {
    /// Returns true when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.profile_picture.is_none()
    }
}

/// Filters for the admin user listing.
#[derive(Debug, Clone)]
pub struct UserQuery {
    /// Case-insensitive substring over name or email.
    pub search: Option<String>,
    pub role: Option<Role>,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            page: 1,
            limit: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" Doctor ".parse::<Role>().unwrap(), Role::Doctor);
        let err = "superuser".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("doctor, pharmacist, admin"));
    }

    #[test]
    fn test_role_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Pharmacist).unwrap(), "\"pharmacist\"");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: RecordId::parse("000001900000000000000001").unwrap(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Doctor,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "doctor");
    }
}
