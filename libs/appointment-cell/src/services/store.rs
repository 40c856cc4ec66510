// libs/appointment-cell/src/services/store.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_database::supabase::{return_representation, ApiError, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentStatus, NewAppointment, SlotTime};

/// Statuses that hold a slot, as a PostgREST `in.(...)` list.
const ACTIVE_STATUSES: &str = "(pending,confirmed)";

/// Persistence for appointments. Every read goes to the store.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Insert a pending appointment. Does not check availability.
    async fn create(&self, patient_id: &str, booking: &NewAppointment) -> Result<Appointment, AppointmentError>;

    /// Times held by pending or confirmed appointments on `date`.
    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<SlotTime>, AppointmentError>;

    /// A patient's appointments, newest first.
    async fn get_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError>;

    /// One day ordered by time, or everything newest first.
    async fn get_all(&self, date: Option<NaiveDate>) -> Result<Vec<Appointment>, AppointmentError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError>;

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment, AppointmentError>;
}

pub(crate) fn map_store_error(context: &str, err: anyhow::Error) -> AppointmentError {
    error!("{}: {}", context, err);
    match err.downcast_ref::<ApiError>() {
        Some(api) if api.is_auth() => AppointmentError::Unauthorized,
        _ => AppointmentError::StoreFailure(context.to_string()),
    }
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>, context: &str) -> Result<Vec<T>, AppointmentError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| map_store_error(context, e.into())))
        .collect()
}

#[derive(Deserialize)]
struct SlotRow {
    time: SlotTime,
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    async fn query(&self, path: &str, context: &str) -> Result<Vec<Value>, AppointmentError> {
        self.supabase.request(
            Method::GET,
            path,
            Some(&self.auth_token),
            None,
        ).await.map_err(|e| map_store_error(context, e))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn create(&self, patient_id: &str, booking: &NewAppointment) -> Result<Appointment, AppointmentError> {
        const CONTEXT: &str = "Failed to book appointment";
        debug!("Creating appointment for {} at {} {}", patient_id, booking.date, booking.time);

        let body = json!({
            "patient_id": patient_id,
            "service_type": booking.service_type,
            "date": booking.date,
            "time": booking.time,
            "status": AppointmentStatus::Pending,
            "notes": booking.notes.clone().unwrap_or_default(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(&self.auth_token),
            Some(body),
            Some(return_representation()),
        ).await.map_err(|e| {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_conflict) {
                info!("Slot {} {} taken at insert time", booking.date, booking.time);
                AppointmentError::SlotUnavailable
            } else {
                map_store_error(CONTEXT, e)
            }
        })?;

        let appointment = parse_rows::<Appointment>(result, CONTEXT)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                error!("Insert returned no appointment row");
                AppointmentError::StoreFailure(CONTEXT.to_string())
            })?;

        info!("Appointment {} created for patient {}", appointment.id, patient_id);
        Ok(appointment)
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<SlotTime>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select=time&date=eq.{}&status=in.{}",
            date, ACTIVE_STATUSES
        );
        let rows = self.query(&path, "Failed to check availability").await?;

        Ok(parse_rows::<SlotRow>(rows, "Failed to check availability")?
            .into_iter()
            .map(|row| row.time)
            .collect())
    }

    async fn get_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.desc,time.desc",
            urlencoding::encode(patient_id)
        );
        let rows = self.query(&path, "Failed to load history").await?;
        parse_rows(rows, "Failed to load history")
    }

    async fn get_all(&self, date: Option<NaiveDate>) -> Result<Vec<Appointment>, AppointmentError> {
        let path = match date {
            Some(date) => format!("/rest/v1/appointments?date=eq.{}&order=time.asc", date),
            None => "/rest/v1/appointments?order=date.desc,time.desc".to_string(),
        };
        let rows = self.query(&path, "Failed to load schedule").await?;
        parse_rows(rows, "Failed to load schedule")
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&limit=1", id);
        let rows = self.query(&path, "Failed to load appointment").await?;
        Ok(parse_rows(rows, "Failed to load appointment")?.into_iter().next())
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment, AppointmentError> {
        const CONTEXT: &str = "Failed to update appointment status";
        debug!("Setting appointment {} to {}", id, status);

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.auth_token),
            Some(json!({ "status": status })),
            Some(return_representation()),
        ).await.map_err(|e| {
            if e.downcast_ref::<ApiError>().is_some_and(ApiError::is_conflict) {
                info!("Appointment {} cannot become {}: slot already held", id, status);
                AppointmentError::SlotUnavailable
            } else {
                map_store_error(CONTEXT, e)
            }
        })?;

        let appointment = parse_rows::<Appointment>(result, CONTEXT)?
            .into_iter()
            .next()
            .ok_or_else(|| AppointmentError::NotFound("Appointment".to_string()))?;

        info!("Appointment {} is now {}", id, status);
        Ok(appointment)
    }
}
