pub mod availability;
pub mod booking;
pub mod calendar;
pub mod clock;
pub mod enrichment;
pub mod lifecycle;
pub mod locks;
pub mod schedule;
pub mod store;
pub mod validation;

use std::sync::Arc;

use patient_cell::services::{
    PatientRecordStore, SupabasePatientRecordStore, SupabaseUserProfileStore, UserProfileStore,
};
use shared_database::supabase::SupabaseClient;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use calendar::{ClinicCalendarStore, SupabaseClinicCalendarStore};
pub use clock::{ClinicClock, Clock, FixedClock};
pub use enrichment::EnrichmentService;
pub use lifecycle::TransitionPolicy;
pub use locks::SlotLocks;
pub use schedule::ScheduleService;
pub use store::{AppointmentStore, SupabaseAppointmentStore};

/// The stores a request works against.
#[derive(Clone)]
pub struct ClinicStores {
    pub appointments: Arc<dyn AppointmentStore>,
    pub calendar: Arc<dyn ClinicCalendarStore>,
    pub profiles: Arc<dyn UserProfileStore>,
    pub records: Arc<dyn PatientRecordStore>,
}

impl ClinicStores {
    /// Supabase-backed stores acting with the caller's token.
    pub fn supabase(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            appointments: Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase), auth_token)),
            calendar: Arc::new(SupabaseClinicCalendarStore::new(Arc::clone(&supabase), auth_token)),
            profiles: Arc::new(SupabaseUserProfileStore::new(Arc::clone(&supabase), auth_token)),
            records: Arc::new(SupabasePatientRecordStore::new(supabase, auth_token)),
        }
    }

    pub fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(self.appointments.clone(), self.calendar.clone())
    }
}
