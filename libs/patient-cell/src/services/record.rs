use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

use shared_database::supabase::{merge_duplicates, ApiError, SupabaseClient};

use crate::models::{PatientError, PatientRecord, PatientRecordUpdate, RecordWriteScope};

const MIN_PHONE_LENGTH: usize = 10;

pub const MSG_SHORT_PHONE: &str = "Phone number must be at least 10 digits";

/// The one phone rule for every write path. Surrounding whitespace does not count.
pub fn phone_number_error(phone: &str) -> Option<&'static str> {
    (phone.trim().chars().count() < MIN_PHONE_LENGTH).then_some(MSG_SHORT_PHONE)
}

#[async_trait]
pub trait PatientRecordStore: Send + Sync {
    async fn get_record(&self, uid: &str) -> Result<Option<PatientRecord>, PatientError>;

    async fn upsert_record(
        &self,
        uid: &str,
        update: PatientRecordUpdate,
        scope: RecordWriteScope,
    ) -> Result<PatientRecord, PatientError>;
}

/// Builds the column patch for a record write under `scope`. Every record
/// write goes through here so field-level permissions live in one place.
///
/// `existing` is the stored record (if any); staff writes derive completeness
/// from the merged result of the update over it.
pub fn scoped_patch(
    uid: &str,
    update: &PatientRecordUpdate,
    existing: Option<&PatientRecord>,
    scope: RecordWriteScope,
) -> Result<Map<String, Value>, PatientError> {
    if let Some(reason) = update.phone_number.as_deref().and_then(phone_number_error) {
        return Err(PatientError::ValidationError(reason.to_string()));
    }

    let mut patch = Map::new();
    patch.insert("uid".to_string(), json!(uid));

    match scope {
        RecordWriteScope::ClientSelfService => {
            if let Some(field) = update.staff_only_fields().first() {
                return Err(PatientError::FieldNotWritable(field.to_string()));
            }
            let phone = update.phone_number.as_ref().ok_or_else(|| {
                PatientError::ValidationError("No writable fields supplied".to_string())
            })?;
            patch.insert("phone_number".to_string(), json!(phone.trim()));
        }
        RecordWriteScope::Staff => {
            if let Some(phone) = &update.phone_number {
                patch.insert("phone_number".to_string(), json!(phone.trim()));
            }
            if let Some(dob) = update.date_of_birth {
                patch.insert("date_of_birth".to_string(), json!(dob.format("%Y-%m-%d").to_string()));
            }
            if let Some(gender) = update.gender {
                patch.insert("gender".to_string(), json!(gender));
            }
            if let Some(address) = &update.address {
                patch.insert("address".to_string(), json!(address));
            }
            if let Some(contact) = &update.emergency_contact {
                patch.insert("emergency_contact".to_string(), json!(contact));
            }
            if let Some(history) = &update.medical_history {
                patch.insert("medical_history".to_string(), json!(history));
            }

            let complete = update
                .is_profile_complete
                .unwrap_or_else(|| derive_completeness(update, existing));
            patch.insert("is_profile_complete".to_string(), json!(complete));
        }
    }

    patch.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
    Ok(patch)
}

/// A record is complete once date of birth, address, emergency contact and
/// gender are all known.
pub fn derive_completeness(update: &PatientRecordUpdate, existing: Option<&PatientRecord>) -> bool {
    let has_text = |new: &Option<String>, old: Option<&Option<String>>| {
        new.as_deref()
            .or_else(|| old.and_then(|o| o.as_deref()))
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    };

    let dob = update.date_of_birth.is_some() || existing.and_then(|r| r.date_of_birth).is_some();
    let gender = update.gender.is_some() || existing.and_then(|r| r.gender).is_some();
    let address = has_text(&update.address, existing.map(|r| &r.address));
    let contact = has_text(&update.emergency_contact, existing.map(|r| &r.emergency_contact));

    dob && gender && address && contact
}

pub(crate) fn map_store_error(context: &str, err: anyhow::Error) -> PatientError {
    error!("{}: {}", context, err);
    match err.downcast_ref::<ApiError>() {
        Some(api) if api.is_auth() => PatientError::Unauthorized,
        _ => PatientError::StoreFailure(context.to_string()),
    }
}

pub struct SupabasePatientRecordStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabasePatientRecordStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl PatientRecordStore for SupabasePatientRecordStore {
    async fn get_record(&self, uid: &str) -> Result<Option<PatientRecord>, PatientError> {
        debug!("Fetching patient record: {}", uid);

        let path = format!("/rest/v1/patient_records?uid=eq.{}&limit=1", urlencoding::encode(uid));
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(|e| map_store_error("Failed to fetch record", e))?;

        match result.into_iter().next() {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| map_store_error("Failed to fetch record", e.into())),
            None => Ok(None),
        }
    }

    async fn upsert_record(
        &self,
        uid: &str,
        update: PatientRecordUpdate,
        scope: RecordWriteScope,
    ) -> Result<PatientRecord, PatientError> {
        debug!("Upserting patient record {} with scope {:?}", uid, scope);

        let existing = match scope {
            RecordWriteScope::Staff => self.get_record(uid).await?,
            RecordWriteScope::ClientSelfService => None,
        };
        let patch = scoped_patch(uid, &update, existing.as_ref(), scope)?;

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patient_records?on_conflict=uid",
            Some(&self.auth_token),
            Some(Value::Object(patch)),
            Some(merge_duplicates()),
        ).await.map_err(|e| map_store_error("Failed to update record", e))?;

        let row = result.into_iter().next().ok_or_else(|| {
            error!("Upsert of patient record {} returned no rows", uid);
            PatientError::StoreFailure("Failed to update record".to_string())
        })?;

        let record: PatientRecord = serde_json::from_value(row)
            .map_err(|e| map_store_error("Failed to update record", e.into()))?;

        info!("Patient record {} updated (complete: {})", uid, record.is_profile_complete);
        Ok(record)
    }
}
