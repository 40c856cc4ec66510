// libs/appointment-cell/src/services/schedule.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_models::auth::{Principal, UserRole};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, AppointmentWithPatient};
use crate::services::enrichment::EnrichmentService;
use crate::services::lifecycle::TransitionPolicy;
use crate::services::locks::SlotLocks;
use crate::services::ClinicStores;

/// Staff-facing schedule reads and status changes.
pub struct ScheduleService {
    stores: ClinicStores,
    enrichment: EnrichmentService,
    slot_locks: Arc<SlotLocks>,
    policy: TransitionPolicy,
}

impl ScheduleService {
    pub fn new(stores: ClinicStores, slot_locks: Arc<SlotLocks>, policy: TransitionPolicy) -> Self {
        let enrichment = EnrichmentService::new(stores.profiles.clone(), stores.records.clone());
        Self { stores, enrichment, slot_locks, policy }
    }

    /// Staff role of the caller. `missing_profile` is returned when the
    /// caller has no stored profile.
    async fn require_staff(
        &self,
        principal: Option<&Principal>,
        missing_profile: AppointmentError,
    ) -> Result<UserRole, AppointmentError> {
        let principal = principal.ok_or(AppointmentError::Unauthenticated)?;
        let profile = self.stores.profiles.get_profile(&principal.user_id).await?
            .ok_or(missing_profile)?;

        if !profile.role.is_staff() {
            warn!("{} ({}) attempted a staff-only action", principal.user_id, profile.role);
            return Err(AppointmentError::Unauthorized);
        }
        Ok(profile.role)
    }

    pub async fn get_schedule(
        &self,
        principal: Option<&Principal>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AppointmentWithPatient>, AppointmentError> {
        let role = self
            .require_staff(principal, AppointmentError::NotFound("User profile".to_string()))
            .await?;
        debug!("Loading schedule for {:?} as {}", date, role);

        let appointments = self.stores.appointments.get_all(date).await?;
        Ok(self.enrichment.enrich(appointments).await)
    }

    pub async fn set_status(
        &self,
        principal: Option<&Principal>,
        id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, AppointmentError> {
        let role = self.require_staff(principal, AppointmentError::Unauthorized).await?;

        if !status.is_active() && !self.policy.needs_current_status() {
            let updated = self.stores.appointments.update_status(id, status).await?;
            info!("{} set appointment {} to {}", role, id, status);
            return Ok(updated);
        }

        let current = self.stores.appointments.get_by_id(id).await?
            .ok_or_else(|| AppointmentError::NotFound("Appointment".to_string()))?;
        if self.policy.needs_current_status() {
            self.policy.validate_status_transition(current.status, status)?;
        }

        // Reopening a released slot has to win it back like a new booking.
        let _slot = if status.is_active() && !current.is_active() {
            let guard = self.slot_locks.acquire(current.date, current.time).await;
            let taken = self.stores.appointments.get_by_date(current.date).await?;
            if taken.contains(&current.time) {
                info!("Slot {} {} was rebooked, cannot reopen appointment {}", current.date, current.time, id);
                return Err(AppointmentError::SlotUnavailable);
            }
            Some(guard)
        } else {
            None
        };

        let updated = self.stores.appointments.update_status(id, status).await?;
        info!("{} set appointment {} to {}", role, id, status);
        Ok(updated)
    }
}
