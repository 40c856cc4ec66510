// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(config: Arc<AppConfig>) -> Router {
    let state = AppointmentState::new(Arc::clone(&config));

    // All appointment operations require authentication
    Router::new()
        // Patient booking
        .route("/", post(handlers::book_appointment))
        .route("/mine", get(handlers::get_my_appointments))

        // Calendar
        .route("/availability", get(handlers::get_availability))
        .route("/off-days", get(handlers::get_off_days))

        // Staff only
        .route("/schedule", get(handlers::get_schedule))
        .route("/{appointment_id}/status", patch(handlers::update_appointment_status))

        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
