// libs/appointment-cell/src/services/lifecycle.rs
use std::str::FromStr;

use tracing::{debug, warn};

use crate::models::{AppointmentError, AppointmentStatus};

/// How strictly staff status changes are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may be set from any status.
    Unrestricted,
    /// Only forward moves along the appointment lifecycle.
    Strict,
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" => Ok(TransitionPolicy::Unrestricted),
            "strict" => Ok(TransitionPolicy::Strict),
            other => Err(format!("Unknown status transition policy '{}'", other)),
        }
    }
}

impl TransitionPolicy {
    /// Whether checking a change needs the appointment's current status.
    pub fn needs_current_status(&self) -> bool {
        matches!(self, TransitionPolicy::Strict)
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {} ({:?})", current_status, new_status, self);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given current status
    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match self {
            TransitionPolicy::Unrestricted => vec![
                AppointmentStatus::Pending,
                AppointmentStatus::Confirmed,
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            TransitionPolicy::Strict => match current_status {
                AppointmentStatus::Pending => vec![
                    AppointmentStatus::Confirmed,
                    AppointmentStatus::Cancelled,
                ],
                AppointmentStatus::Confirmed => vec![
                    AppointmentStatus::Completed,
                    AppointmentStatus::Cancelled,
                ],
                // Terminal states
                AppointmentStatus::Completed => vec![],
                AppointmentStatus::Cancelled => vec![],
            },
        }
    }
}
