// libs/appointment-cell/src/services/calendar.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, ClinicOffDay};
use crate::services::store::map_store_error;

/// Read-only view of clinic closures.
#[async_trait]
pub trait ClinicCalendarStore: Send + Sync {
    /// Off days between `from` and `to`, both inclusive, in date order.
    async fn get_off_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClinicOffDay>, AppointmentError>;
}

pub struct SupabaseClinicCalendarStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseClinicCalendarStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }
}

#[async_trait]
impl ClinicCalendarStore for SupabaseClinicCalendarStore {
    async fn get_off_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClinicOffDay>, AppointmentError> {
        const CONTEXT: &str = "Failed to fetch calendar info";
        debug!("Fetching clinic off days {}..{}", from, to);

        let path = format!(
            "/rest/v1/clinic_off_days?date=gte.{}&date=lte.{}&order=date.asc",
            from, to
        );
        let rows: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(&self.auth_token),
            None,
        ).await.map_err(|e| map_store_error(CONTEXT, e))?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(|e| map_store_error(CONTEXT, e.into())))
            .collect()
    }
}
