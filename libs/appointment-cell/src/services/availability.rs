// libs/appointment-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{AppointmentError, Availability, ClinicOffDay};
use crate::services::calendar::ClinicCalendarStore;
use crate::services::store::AppointmentStore;

/// Answers "what can still be booked on this day". Read-only.
pub struct AvailabilityService {
    appointments: Arc<dyn AppointmentStore>,
    calendar: Arc<dyn ClinicCalendarStore>,
}

impl AvailabilityService {
    pub fn new(appointments: Arc<dyn AppointmentStore>, calendar: Arc<dyn ClinicCalendarStore>) -> Self {
        Self { appointments, calendar }
    }

    /// Taken slots and holiday status for `date`.
    ///
    /// Each lookup fails open: a store error is logged and reads as "nothing
    /// taken" or "not a holiday". Booking re-checks occupancy on its own.
    pub async fn get_availability(&self, date: NaiveDate) -> Availability {
        debug!("Resolving availability for {}", date);

        let (taken, off_days) = futures::join!(
            self.appointments.get_by_date(date),
            self.calendar.get_off_days(date, date),
        );

        let taken_slots = taken.unwrap_or_else(|e| {
            warn!("Taken slots for {} unavailable, reporting none: {}", date, e);
            Vec::new()
        });
        let off_days = off_days.unwrap_or_else(|e| {
            warn!("Off days for {} unavailable, treating as open: {}", date, e);
            Vec::new()
        });

        let holiday = off_days.into_iter().find(|day| day.date == date);

        Availability {
            taken_slots,
            is_holiday: holiday.is_some(),
            holiday_reason: holiday.and_then(|day| day.reason),
        }
    }

    /// Off days in an inclusive range, for month views.
    pub async fn get_off_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClinicOffDay>, AppointmentError> {
        if from > to {
            return Err(AppointmentError::Validation(
                "Range start must not be after its end".to_string(),
            ));
        }
        self.calendar.get_off_days(from, to).await
    }
}
