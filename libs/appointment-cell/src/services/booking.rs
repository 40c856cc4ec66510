// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use tracing::{debug, info};

use patient_cell::models::{PatientRecordUpdate, RecordWriteScope};
use shared_models::auth::Principal;

use crate::models::{Appointment, AppointmentError, BookingRequest, BookingRules};
use crate::services::clock::Clock;
use crate::services::locks::SlotLocks;
use crate::services::validation::validate_booking;
use crate::services::ClinicStores;

pub struct BookingService {
    stores: ClinicStores,
    slot_locks: Arc<SlotLocks>,
    clock: Arc<dyn Clock>,
    rules: BookingRules,
}

impl BookingService {
    pub fn new(stores: ClinicStores, slot_locks: Arc<SlotLocks>, clock: Arc<dyn Clock>, rules: BookingRules) -> Self {
        Self { stores, slot_locks, clock, rules }
    }

    /// Books a pending appointment for the caller.
    ///
    /// Profile edits carried on the form are written before the slot is
    /// claimed and are not rolled back if the booking then fails.
    pub async fn book(
        &self,
        principal: Option<&Principal>,
        request: BookingRequest,
    ) -> Result<Appointment, AppointmentError> {
        let principal = principal.ok_or(AppointmentError::Unauthenticated)?;
        let patient_id = principal.user_id.as_str();

        let booking = validate_booking(&request, self.clock.today(), &self.rules)?;
        debug!("Booking request from {} for {} {} passed validation", patient_id, booking.date, booking.time);

        if let Some(name) = request.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let profile = self.stores.profiles.get_profile(patient_id).await?;
            if profile.as_ref().and_then(|p| p.name()) != Some(name) {
                self.stores.profiles.update_display_name(patient_id, name).await?;
                info!("Updated display name for {}", patient_id);
            }
        }

        if let Some(phone) = request.phone_number {
            self.stores.records.upsert_record(
                patient_id,
                PatientRecordUpdate::phone_only(phone),
                RecordWriteScope::ClientSelfService,
            ).await?;
        }

        let _slot = self.slot_locks.acquire(booking.date, booking.time).await;

        let taken = self.stores.appointments.get_by_date(booking.date).await?;
        if taken.contains(&booking.time) {
            info!("Slot {} {} already taken, rejecting booking from {}", booking.date, booking.time, patient_id);
            return Err(AppointmentError::SlotUnavailable);
        }

        let appointment = self.stores.appointments.create(patient_id, &booking).await?;
        info!("Booked appointment {} for {} on {} at {}", appointment.id, patient_id, appointment.date, appointment.time);

        Ok(appointment)
    }

    /// The caller's own appointments, newest first.
    pub async fn my_appointments(&self, principal: Option<&Principal>) -> Result<Vec<Appointment>, AppointmentError> {
        let principal = principal.ok_or(AppointmentError::Unauthenticated)?;
        self.stores.appointments.get_by_patient(&principal.user_id).await
    }
}
