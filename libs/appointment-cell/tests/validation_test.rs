mod common;

use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::models::{AppointmentError, BookingRequest, BookingRules};
use appointment_cell::services::validation::*;

use common::{booking, day, slot};

#[test]
fn test_date_window_is_tomorrow_through_two_weeks() {
    let today = day(2030, 6, 10);

    assert_eq!(validate_date(today, today), Some(MSG_TOO_SOON.to_string()));
    assert_eq!(validate_date(today - Duration::days(3), today), Some(MSG_TOO_SOON.to_string()));
    assert_eq!(validate_date(today + Duration::days(1), today), None);
    assert_eq!(validate_date(today + Duration::days(14), today), None);
    assert_eq!(validate_date(today + Duration::days(15), today), Some(MSG_TOO_FAR.to_string()));
}

#[test]
fn test_date_window_follows_rules() {
    let today = day(2030, 6, 10);
    let rules = BookingRules {
        min_days_ahead: 2,
        max_days_ahead: 30,
        ..BookingRules::default()
    };

    assert!(validate_date_with(today + Duration::days(1), today, &rules).is_some());
    assert!(validate_date_with(today + Duration::days(30), today, &rules).is_none());
}

#[test]
fn test_opening_hours_boundaries() {
    for (h, m) in [(8, 0), (9, 0), (11, 0), (13, 0), (16, 0)] {
        assert_eq!(validate_time(slot(h, m)), None, "{:02}:{:02} should pass", h, m);
    }
    assert_eq!(validate_time(slot(7, 59)), Some(MSG_OUTSIDE_HOURS.to_string()));
    assert_eq!(validate_time(slot(17, 1)), Some(MSG_OUTSIDE_HOURS.to_string()));
    assert_eq!(validate_time(slot(18, 0)), Some(MSG_OUTSIDE_HOURS.to_string()));
}

/// 17:00 sits inside opening hours but is not an offered slot. The menu rule
/// decides, and it is on by default.
#[test]
fn test_five_pm_passes_hours_but_not_the_menu() {
    let five_pm = slot(17, 0);
    assert_eq!(validate_time(five_pm), None);
    assert_eq!(validate_slot(five_pm, &BookingRules::default()), Some(MSG_OFF_MENU.to_string()));

    let lenient = BookingRules {
        enforce_slot_menu: false,
        ..BookingRules::default()
    };
    assert_eq!(validate_slot(five_pm, &lenient), None);
}

#[test]
fn test_lunch_hour_is_off_menu() {
    assert_eq!(validate_slot(slot(12, 0), &BookingRules::default()), Some(MSG_OFF_MENU.to_string()));
    assert_eq!(validate_slot(slot(9, 30), &BookingRules::default()), Some(MSG_OFF_MENU.to_string()));
}

#[test]
fn test_validate_booking_accepts_menu_slot() {
    let today = day(2030, 6, 10);
    let request = BookingRequest {
        notes: Some("Sensitive tooth".to_string()),
        ..booking("2030-06-12", "09:00")
    };

    let validated = validate_booking(&request, today, &BookingRules::default()).unwrap();
    assert_eq!(validated.date, day(2030, 6, 12));
    assert_eq!(validated.time, slot(9, 0));
    assert_eq!(validated.notes.as_deref(), Some("Sensitive tooth"));
}

#[test]
fn test_validate_booking_reports_first_failure() {
    let today = day(2030, 6, 10);
    let rules = BookingRules::default();

    let no_service = BookingRequest {
        service_type: "  ".to_string(),
        ..booking("bad", "bad")
    };
    assert_matches!(
        validate_booking(&no_service, today, &rules),
        Err(AppointmentError::Validation(msg)) if msg == MSG_SERVICE_REQUIRED
    );

    assert_matches!(
        validate_booking(&booking("12/06/2030", "09:00"), today, &rules),
        Err(AppointmentError::Validation(msg)) if msg == MSG_BAD_DATE
    );
    assert_matches!(
        validate_booking(&booking("2030-06-12", "9am"), today, &rules),
        Err(AppointmentError::Validation(msg)) if msg == MSG_BAD_TIME
    );

    // Date is checked before time.
    assert_matches!(
        validate_booking(&booking("2030-06-10", "07:00"), today, &rules),
        Err(AppointmentError::Validation(msg)) if msg == MSG_TOO_SOON
    );
    assert_matches!(
        validate_booking(&booking("2030-06-12", "17:00"), today, &rules),
        Err(AppointmentError::Validation(msg)) if msg == MSG_OFF_MENU
    );
}

#[test]
fn test_validate_booking_checks_phone_length() {
    let today = day(2030, 6, 10);
    let request = BookingRequest {
        phone_number: Some("12345".to_string()),
        ..booking("2030-06-12", "09:00")
    };

    assert_matches!(
        validate_booking(&request, today, &BookingRules::default()),
        Err(AppointmentError::Validation(msg)) if msg == MSG_SHORT_PHONE
    );
}
