// libs/appointment-cell/src/services/enrichment.rs
use std::sync::Arc;

use futures::future::join_all;
use tracing::warn;

use patient_cell::services::{PatientRecordStore, UserProfileStore};

use crate::models::{Appointment, AppointmentWithPatient};

const UNKNOWN_PATIENT: &str = "Unknown";

/// Attaches patient name and profile completeness to appointments.
pub struct EnrichmentService {
    profiles: Arc<dyn UserProfileStore>,
    records: Arc<dyn PatientRecordStore>,
}

impl EnrichmentService {
    pub fn new(profiles: Arc<dyn UserProfileStore>, records: Arc<dyn PatientRecordStore>) -> Self {
        Self { profiles, records }
    }

    /// Output order matches input order. A failed lookup only blanks its own field.
    pub async fn enrich(&self, appointments: Vec<Appointment>) -> Vec<AppointmentWithPatient> {
        join_all(appointments.into_iter().map(|appointment| self.enrich_one(appointment))).await
    }

    async fn enrich_one(&self, appointment: Appointment) -> AppointmentWithPatient {
        let patient_id = appointment.patient_id.as_str();
        let (profile, record) = futures::join!(
            self.profiles.get_profile(patient_id),
            self.records.get_record(patient_id),
        );

        let patient_name = match profile {
            Ok(profile) => profile
                .as_ref()
                .and_then(|p| p.name())
                .unwrap_or(UNKNOWN_PATIENT)
                .to_string(),
            Err(e) => {
                warn!("Profile lookup for {} failed: {}", patient_id, e);
                UNKNOWN_PATIENT.to_string()
            }
        };

        let is_profile_complete = match record {
            Ok(record) => record.is_some_and(|r| r.is_profile_complete),
            Err(e) => {
                warn!("Record lookup for {} failed: {}", patient_id, e);
                false
            }
        };

        AppointmentWithPatient {
            appointment,
            patient_name,
            is_profile_complete,
        }
    }
}
