//! Prescriptions and their status lifecycle.

// Struct fields mirror the JSON wire format and are self-describing
#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::{RecordId, UserSummary};

/// Upper bound accepted for `patientAge`.
pub const MAX_PATIENT_AGE: u32 = 150;

/// Status of a prescription.
///
/// `Active` is the initial state. Any state may be set from any other; the
/// only guard on transitions is authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

impl PrescriptionStatus {
    /// All statuses.
    pub const ALL: [PrescriptionStatus; 3] = [
        PrescriptionStatus::Active,
        PrescriptionStatus::Completed,
        PrescriptionStatus::Cancelled,
    ];

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "active",
            PrescriptionStatus::Completed => "completed",
            PrescriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PrescriptionStatus::Active),
            "completed" => Ok(PrescriptionStatus::Completed),
            "cancelled" => Ok(PrescriptionStatus::Cancelled),
            _ => Err(ValidationError::InvalidField {
                field: "status".to_string(),
                message: format!(
                    "must be one of {}",
                    PrescriptionStatus::ALL.map(|s| s.as_str()).join(", ")
                ),
            }),
        }
    }
}

/// One line of a prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescribedMedicine {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// A stored prescription. `doctor` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: RecordId,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_email: Option<String>,
    pub doctor: RecordId,
    pub medicines: Vec<PrescribedMedicine>,
    pub diagnosis: String,
    pub doctor_notes: Option<String>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prescription {
    /// Joins the owning doctor's summary onto the record.
    ///
    /// The doctor may be `None` when the account was removed after the
    /// prescription was written.
    pub fn with_doctor(self, doctor: Option<UserSummary>) -> PrescriptionView {
        PrescriptionView {
            id: self.id,
            patient_name: self.patient_name,
            patient_age: self.patient_age,
            patient_email: self.patient_email,
            doctor_id: self.doctor,
            doctor,
            medicines: self.medicines,
            diagnosis: self.diagnosis,
            doctor_notes: self.doctor_notes,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A prescription joined with its doctor's `{name, email, role}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionView {
    pub id: RecordId,
    pub patient_name: String,
    pub patient_age: u32,
    pub patient_email: Option<String>,
    pub doctor_id: RecordId,
    pub doctor: Option<UserSummary>,
    pub medicines: Vec<PrescribedMedicine>,
    pub diagnosis: String,
    pub doctor_notes: Option<String>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a prescription. The doctor is taken from the requester.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_age: Option<u32>,
    #[serde(default)]
    pub patient_email: Option<String>,
    #[serde(default)]
    pub medicines: Vec<PrescribedMedicine>,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub doctor_notes: Option<String>,
}

impl NewPrescription {
    /// Checks required fields and ranges, collecting every violation.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.patient_name.trim().is_empty() {
            errors.push(ValidationError::MissingRequiredField {
                field: "patientName".to_string(),
            });
        }

        match self.patient_age {
            None => errors.push(ValidationError::MissingRequiredField {
                field: "patientAge".to_string(),
            }),
            Some(age) if age > MAX_PATIENT_AGE => errors.push(ValidationError::InvalidField {
                field: "patientAge".to_string(),
                message: format!("must be between 0 and {}", MAX_PATIENT_AGE),
            }),
            Some(_) => {}
        }

        if self.diagnosis.trim().is_empty() {
            errors.push(ValidationError::MissingRequiredField {
                field: "diagnosis".to_string(),
            });
        }

        if let Some(position) = self
            .medicines
            .iter()
            .position(|m| m.name.trim().is_empty())
        {
            errors.push(ValidationError::InvalidField {
                field: format!("medicines[{}].name", position),
                message: "must not be empty".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Prescriptions per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    /// `YYYY-MM-DD` in UTC.
    pub date: String,
    pub count: u64,
}

/// Occurrences of a diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosisCount {
    pub diagnosis: String,
    pub count: u64,
}

/// Dashboard aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionStats {
    pub treated_stats: Vec<DailyCount>,
    pub diagnosis_stats: Vec<DiagnosisCount>,
    pub recent_prescriptions: Vec<Prescription>,
}
