// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate, NaiveTime, Timelike};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use shared_config::AppConfig;

use crate::services::lifecycle::TransitionPolicy;

// ==============================================================================
// SLOT TIMES
// ==============================================================================

/// Clinic slots offered for booking, lunch hour excluded.
pub const SLOT_MENU: [(u32, u32); 8] = [
    (8, 0), (9, 0), (10, 0), (11, 0),
    (13, 0), (14, 0), (15, 0), (16, 0),
];

/// Wall-clock time of a booking, written as 24h `HH:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(SlotTime)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Every slot of `SLOT_MENU`, in clock order.
    pub fn menu() -> Vec<SlotTime> {
        SLOT_MENU
            .iter()
            .filter_map(|&(h, m)| SlotTime::from_hm(h, m))
            .collect()
    }

    pub fn is_on_menu(&self) -> bool {
        SLOT_MENU.contains(&(self.hour(), self.minute()))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for SlotTime {
    type Err = String;

    /// Accepts `HH:mm`, and the `HH:mm:ss` form a SQL `time` column returns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(SlotTime)
            .map_err(|_| format!("Invalid time format (HH:mm): {}", s))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: String,
    pub dentist_id: Option<String>,
    pub service_type: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Pending and confirmed appointments occupy their slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Clinic-wide closure day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicOffDay {
    pub id: String,
    pub date: NaiveDate,
    pub reason: Option<String>,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

/// Booking form as submitted. Fields stay raw strings so every rejection
/// carries the clinic's own message rather than a deserializer error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_type: String,
    pub date: String,
    pub time: String,
    pub notes: Option<String>,
    /// Updates the caller's profile name when it differs from the stored one.
    pub display_name: Option<String>,
    /// Written to the caller's patient record (self-service scope).
    pub phone_number: Option<String>,
}

/// A booking that passed validation, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub service_type: String,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Availability {
    pub taken_slots: Vec<SlotTime>,
    pub is_holiday: bool,
    pub holiday_reason: Option<String>,
}

/// Staff view of an appointment with patient details attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentWithPatient {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub is_profile_complete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OffDayRangeQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleQuery {
    pub date: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("{0}")]
    Validation(String),

    #[error("You must be logged in to perform this action.")]
    Unauthenticated,

    #[error("Unauthorized: Staff access required")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Selected time slot is no longer available.")]
    SlotUnavailable,

    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("{0}")]
    StoreFailure(String),
}

impl From<patient_cell::PatientError> for AppointmentError {
    fn from(e: patient_cell::PatientError) -> Self {
        use patient_cell::PatientError;
        match e {
            PatientError::NotFound(what) => AppointmentError::NotFound(what),
            PatientError::FieldNotWritable(_) => AppointmentError::Validation(e.to_string()),
            PatientError::Unauthorized => AppointmentError::Unauthorized,
            PatientError::ValidationError(msg) => AppointmentError::Validation(msg),
            PatientError::StoreFailure(msg) => AppointmentError::StoreFailure(msg),
        }
    }
}

// ==============================================================================
// BOOKING RULES
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRules {
    /// Earliest bookable day, counted from today (1 = tomorrow).
    pub min_days_ahead: i64,
    /// Latest bookable day, counted from today.
    pub max_days_ahead: i64,
    /// Reject times that are not on `SLOT_MENU` even if inside opening hours.
    pub enforce_slot_menu: bool,
    pub transition_policy: TransitionPolicy,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            min_days_ahead: 1,
            max_days_ahead: 14,
            enforce_slot_menu: true,
            transition_policy: TransitionPolicy::Unrestricted,
        }
    }
}

impl BookingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        let transition_policy = config
            .status_transition_policy
            .parse()
            .unwrap_or_else(|e| {
                warn!("{}, falling back to unrestricted status transitions", e);
                TransitionPolicy::Unrestricted
            });

        Self {
            min_days_ahead: config.booking_min_days_ahead,
            max_days_ahead: config.booking_max_days_ahead,
            enforce_slot_menu: config.enforce_slot_menu,
            transition_policy,
        }
    }
}
