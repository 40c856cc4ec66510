// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::principal_from;

use crate::models::{
    AppointmentError, AvailabilityQuery, BookingRequest, BookingRules, OffDayRangeQuery,
    ScheduleQuery, StatusUpdateRequest,
};
use crate::services::validation::parse_date;
use crate::services::{BookingService, ClinicClock, ClinicStores, Clock, ScheduleService, SlotLocks};

/// Shared by every appointment route. Slot locks must outlive a request.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub supabase: Arc<SupabaseClient>,
    pub slot_locks: Arc<SlotLocks>,
    pub clock: Arc<dyn Clock>,
}

impl AppointmentState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        let supabase = Arc::new(SupabaseClient::new(&config));
        let clock = Arc::new(ClinicClock::from_offset_minutes(config.clinic_utc_offset_minutes));
        Self {
            config,
            supabase,
            slot_locks: Arc::new(SlotLocks::new()),
            clock,
        }
    }

    fn stores(&self, token: &str) -> ClinicStores {
        ClinicStores::supabase(Arc::clone(&self.supabase), token)
    }

    fn rules(&self) -> BookingRules {
        BookingRules::from_config(&self.config)
    }

    fn booking_service(&self, token: &str) -> BookingService {
        BookingService::new(
            self.stores(token),
            Arc::clone(&self.slot_locks),
            Arc::clone(&self.clock),
            self.rules(),
        )
    }

    fn schedule_service(&self, token: &str) -> ScheduleService {
        ScheduleService::new(
            self.stores(token),
            Arc::clone(&self.slot_locks),
            self.rules().transition_policy,
        )
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        let message = e.to_string();
        match e {
            AppointmentError::Validation(_) => AppError::ValidationError(message),
            AppointmentError::Unauthenticated => AppError::Auth(message),
            AppointmentError::Unauthorized => AppError::Forbidden(message),
            AppointmentError::NotFound(_) => AppError::NotFound(message),
            AppointmentError::SlotUnavailable => AppError::Conflict(message),
            AppointmentError::InvalidStatusTransition { .. } => AppError::Conflict(message),
            AppointmentError::StoreFailure(_) => AppError::Database(message),
        }
    }
}

// ==============================================================================
// PATIENT BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    let booking_service = state.booking_service(auth.token());

    let appointment = booking_service
        .book(principal_from(Some(&user)).as_ref(), request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_my_appointments(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let booking_service = state.booking_service(auth.token());

    let appointments = booking_service
        .my_appointments(principal_from(Some(&user)).as_ref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

// ==============================================================================
// CALENDAR HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&query.date)?;
    let availability = state.stores(auth.token()).availability().get_availability(date).await;

    Ok(Json(json!({
        "success": true,
        "date": date,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn get_off_days(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<OffDayRangeQuery>,
) -> Result<Json<Value>, AppError> {
    let from = parse_date(&query.from)?;
    let to = parse_date(&query.to)?;
    let off_days = state.stores(auth.token()).availability().get_off_days(from, to).await?;

    Ok(Json(json!({
        "success": true,
        "total": off_days.len(),
        "off_days": off_days
    })))
}

// ==============================================================================
// STAFF HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ScheduleQuery>,
) -> Result<Json<Value>, AppError> {
    let date = query.date.as_deref().map(parse_date).transpose()?;
    let schedule_service = state.schedule_service(auth.token());

    let appointments = schedule_service
        .get_schedule(principal_from(Some(&user)).as_ref(), date)
        .await?;

    Ok(Json(json!({
        "success": true,
        "total": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<Value>, AppError> {
    let schedule_service = state.schedule_service(auth.token());

    let appointment = schedule_service
        .set_status(principal_from(Some(&user)).as_ref(), appointment_id, request.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": format!("Appointment marked as {}", appointment.status)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_clones_share_one_clock_and_lock_table() {
        let state = AppointmentState::new(Arc::new(AppConfig::default()));
        let cloned = state.clone();

        assert!(Arc::ptr_eq(&state.clock, &cloned.clock));
        assert!(Arc::ptr_eq(&state.slot_locks, &cloned.slot_locks));
    }
}
