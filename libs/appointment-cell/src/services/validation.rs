// libs/appointment-cell/src/services/validation.rs
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;

use patient_cell::services::phone_number_error;

use crate::models::{AppointmentError, BookingRequest, BookingRules, NewAppointment, SlotTime};

static DATE_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern compiles"));
static TIME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("time pattern compiles"));

const OPENING_HOUR: u32 = 8;
const CLOSING_HOUR: u32 = 17;

pub const MSG_SERVICE_REQUIRED: &str = "Please select a service";
pub const MSG_BAD_DATE: &str = "Invalid date format (YYYY-MM-DD)";
pub const MSG_BAD_TIME: &str = "Invalid time format (HH:mm)";
pub use patient_cell::services::record::MSG_SHORT_PHONE;
pub const MSG_TOO_SOON: &str = "Appointments must be booked at least 1 day in advance.";
pub const MSG_TOO_FAR: &str = "Appointments cannot be booked more than 2 weeks in advance.";
pub const MSG_OUTSIDE_HOURS: &str = "Appointments are only available between 08:00 and 17:00.";
pub const MSG_OFF_MENU: &str = "Please choose one of the available time slots.";

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    if !DATE_FORMAT.is_match(raw) {
        return Err(AppointmentError::Validation(MSG_BAD_DATE.to_string()));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppointmentError::Validation(MSG_BAD_DATE.to_string()))
}

/// Parse a strict 24h `HH:mm` time.
pub fn parse_time(raw: &str) -> Result<SlotTime, AppointmentError> {
    if !TIME_FORMAT.is_match(raw) {
        return Err(AppointmentError::Validation(MSG_BAD_TIME.to_string()));
    }
    raw.parse()
        .map_err(|_| AppointmentError::Validation(MSG_BAD_TIME.to_string()))
}

/// Lead-time window check with the default rules.
pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Option<String> {
    validate_date_with(date, today, &BookingRules::default())
}

/// A window edge past the calendar's range rejects the date rather than
/// widening the window.
pub fn validate_date_with(date: NaiveDate, today: NaiveDate, rules: &BookingRules) -> Option<String> {
    match days_from(today, rules.min_days_ahead) {
        Some(earliest) if date >= earliest => {}
        _ => return Some(MSG_TOO_SOON.to_string()),
    }
    match days_from(today, rules.max_days_ahead) {
        Some(latest) if date <= latest => None,
        _ => Some(MSG_TOO_FAR.to_string()),
    }
}

fn days_from(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    let span = Days::new(days.unsigned_abs());
    if days >= 0 {
        today.checked_add_days(span)
    } else {
        today.checked_sub_days(span)
    }
}

/// Opening-hours check. 17:00 itself is inside the window.
pub fn validate_time(time: SlotTime) -> Option<String> {
    let after_close = time.hour() > CLOSING_HOUR || (time.hour() == CLOSING_HOUR && time.minute() > 0);
    if time.hour() < OPENING_HOUR || after_close {
        return Some(MSG_OUTSIDE_HOURS.to_string());
    }
    None
}

pub fn validate_slot(time: SlotTime, rules: &BookingRules) -> Option<String> {
    validate_time(time).or_else(|| {
        (rules.enforce_slot_menu && !time.is_on_menu()).then(|| MSG_OFF_MENU.to_string())
    })
}

/// Same rule the patient record store applies on write.
pub fn validate_phone(phone: &str) -> Option<String> {
    phone_number_error(phone).map(str::to_string)
}

/// Runs shape, date, then time checks and reports the first failure.
pub fn validate_booking(
    request: &BookingRequest,
    today: NaiveDate,
    rules: &BookingRules,
) -> Result<NewAppointment, AppointmentError> {
    if request.service_type.trim().is_empty() {
        return Err(AppointmentError::Validation(MSG_SERVICE_REQUIRED.to_string()));
    }
    let date = parse_date(&request.date)?;
    let time = parse_time(&request.time)?;
    if let Some(reason) = request.phone_number.as_deref().and_then(validate_phone) {
        return Err(AppointmentError::Validation(reason));
    }

    if let Some(reason) = validate_date_with(date, today, rules) {
        return Err(AppointmentError::Validation(reason));
    }
    if let Some(reason) = validate_slot(time, rules) {
        return Err(AppointmentError::Validation(reason));
    }

    Ok(NewAppointment {
        service_type: request.service_type.clone(),
        date,
        time,
        notes: request.notes.clone(),
    })
}
