use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc, NaiveDate};

use shared_models::auth::UserRole;

// ==============================================================================
// USER PROFILES
// ==============================================================================

/// Row of the `users` table: role and display name for every account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub uid: String,
    pub email: String,
    pub role: UserRole,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Display name, treating an empty string as unset.
    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|n| !n.trim().is_empty())
    }
}

// ==============================================================================
// PATIENT RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MedicalHistory {
    pub allergies: Option<Vec<String>>,
    pub current_medications: Option<String>,
    pub past_conditions: Option<String>,
    pub notes: Option<String>,
}

/// Row of the `patient_records` table, keyed by the user's uid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    pub uid: String,
    #[serde(default)]
    pub phone_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<MedicalHistory>,
    #[serde(default)]
    pub is_profile_complete: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial write against a patient record. Which fields may be set depends on
/// the caller's `RecordWriteScope`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientRecordUpdate {
    pub phone_number: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    pub emergency_contact: Option<String>,
    pub medical_history: Option<MedicalHistory>,
    pub is_profile_complete: Option<bool>,
}

impl PatientRecordUpdate {
    pub fn phone_only(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: Some(phone_number.into()),
            ..Self::default()
        }
    }

    /// Names of the clinical/staff-only fields present in this update.
    pub fn staff_only_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.date_of_birth.is_some() {
            fields.push("date_of_birth");
        }
        if self.gender.is_some() {
            fields.push("gender");
        }
        if self.address.is_some() {
            fields.push("address");
        }
        if self.emergency_contact.is_some() {
            fields.push("emergency_contact");
        }
        if self.medical_history.is_some() {
            fields.push("medical_history");
        }
        if self.is_profile_complete.is_some() {
            fields.push("is_profile_complete");
        }
        fields
    }
}

/// Capability under which a patient record write is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordWriteScope {
    /// Patient editing their own record: phone number only, completeness untouched.
    ClientSelfService,
    /// Clinic staff: every field, completeness derived unless set explicitly.
    Staff,
}

impl RecordWriteScope {
    pub fn for_role(role: UserRole) -> Self {
        if role.is_staff() {
            RecordWriteScope::Staff
        } else {
            RecordWriteScope::ClientSelfService
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq)]
pub enum PatientError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Field {0} cannot be updated by the patient")]
    FieldNotWritable(String),

    #[error("Unauthorized access to patient data")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    StoreFailure(String),
}
