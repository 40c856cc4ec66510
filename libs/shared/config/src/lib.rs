use std::env;
use std::str::FromStr;
use tracing::warn;

/// Furthest booking horizon accepted from the environment, in days.
pub const MAX_BOOKING_HORIZON_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub clinic_utc_offset_minutes: i32,
    pub booking_min_days_ahead: i64,
    pub booking_max_days_ahead: i64,
    pub enforce_slot_menu: bool,
    pub status_transition_policy: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            clinic_utc_offset_minutes: 0,
            booking_min_days_ahead: 1,
            booking_max_days_ahead: 14,
            enforce_slot_menu: true,
            status_transition_policy: "unrestricted".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            clinic_utc_offset_minutes: parse_var(
                "CLINIC_UTC_OFFSET_MINUTES",
                defaults.clinic_utc_offset_minutes,
            ),
            booking_min_days_ahead: parse_var(
                "BOOKING_MIN_DAYS_AHEAD",
                defaults.booking_min_days_ahead,
            ),
            booking_max_days_ahead: parse_var(
                "BOOKING_MAX_DAYS_AHEAD",
                defaults.booking_max_days_ahead,
            ),
            enforce_slot_menu: parse_var("ENFORCE_SLOT_MENU", defaults.enforce_slot_menu),
            status_transition_policy: env::var("STATUS_TRANSITION_POLICY")
                .unwrap_or(defaults.status_transition_policy),
        };

        let config = config.with_bounded_booking_window();

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Clamps both window edges into `0..=MAX_BOOKING_HORIZON_DAYS` and
    /// falls back to the defaults when the minimum lands past the maximum.
    pub fn with_bounded_booking_window(self) -> Self {
        let defaults = Self::default();
        let min = clamp_var("BOOKING_MIN_DAYS_AHEAD", self.booking_min_days_ahead, 0, MAX_BOOKING_HORIZON_DAYS);
        let max = clamp_var("BOOKING_MAX_DAYS_AHEAD", self.booking_max_days_ahead, 1, MAX_BOOKING_HORIZON_DAYS);

        let (booking_min_days_ahead, booking_max_days_ahead) = if min > max {
            warn!(
                "BOOKING_MIN_DAYS_AHEAD ({}) is after BOOKING_MAX_DAYS_AHEAD ({}), using defaults {} and {}",
                min, max, defaults.booking_min_days_ahead, defaults.booking_max_days_ahead
            );
            (defaults.booking_min_days_ahead, defaults.booking_max_days_ahead)
        } else {
            (min, max)
        };

        Self { booking_min_days_ahead, booking_max_days_ahead, ..self }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

// Unset keeps the default silently; an unparseable value warns and keeps it too.
fn parse_var<T: FromStr + Copy + std::fmt::Debug>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value {:?}, using default {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn clamp_var(key: &str, value: i64, min: i64, max: i64) -> i64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!("{} value {} is outside {}..={}, using {}", key, value, min, max, clamped);
    }
    clamped
}
