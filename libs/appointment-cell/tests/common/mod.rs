#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use appointment_cell::models::{
    Appointment, AppointmentError, AppointmentStatus, BookingRequest, ClinicOffDay, NewAppointment, SlotTime,
};
use appointment_cell::services::{AppointmentStore, ClinicCalendarStore, ClinicStores};
use patient_cell::models::{PatientError, PatientRecord, PatientRecordUpdate, RecordWriteScope, UserProfile};
use patient_cell::services::{scoped_patch, PatientRecordStore, UserProfileStore};
use shared_models::auth::UserRole;

/// Ordered log of writes across all fake stores.
pub type EventLog = Arc<Mutex<Vec<String>>>;

fn log(events: &EventLog, event: String) {
    events.lock().unwrap().push(event);
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn slot(h: u32, m: u32) -> SlotTime {
    SlotTime::from_hm(h, m).unwrap()
}

pub fn booking(date: &str, time: &str) -> BookingRequest {
    BookingRequest {
        service_type: "General Checkup".to_string(),
        date: date.to_string(),
        time: time.to_string(),
        ..BookingRequest::default()
    }
}

pub fn appointment(patient_id: &str, date: NaiveDate, time: SlotTime, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: patient_id.to_string(),
        dentist_id: None,
        service_type: "General Checkup".to_string(),
        date,
        time,
        status,
        notes: Some(String::new()),
        created_at: Utc::now(),
    }
}

pub fn profile(uid: &str, role: UserRole, display_name: Option<&str>) -> UserProfile {
    UserProfile {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        role,
        display_name: display_name.map(str::to_string),
        photo_url: None,
        created_at: None,
    }
}

pub fn record(uid: &str, complete: bool) -> PatientRecord {
    PatientRecord {
        uid: uid.to_string(),
        phone_number: String::new(),
        date_of_birth: None,
        gender: None,
        address: None,
        emergency_contact: None,
        medical_history: None,
        is_profile_complete: complete,
        updated_at: None,
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

/// In-memory appointment table. It does not enforce slot uniqueness, so any
/// double-booking protection observed in tests comes from the caller.
pub struct FakeAppointmentStore {
    rows: Mutex<Vec<Appointment>>,
    events: EventLog,
    read_delay: Mutex<Option<Duration>>,
    failing: Mutex<bool>,
}

impl FakeAppointmentStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            events,
            read_delay: Mutex::new(None),
            failing: Mutex::new(false),
        }
    }

    pub fn insert(&self, appointment: Appointment) {
        self.rows.lock().unwrap().push(appointment);
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.rows.lock().unwrap().clone()
    }

    /// Sleep after reading occupancy, widening any check-then-insert race.
    pub fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }

    fn check(&self) -> Result<(), AppointmentError> {
        if *self.failing.lock().unwrap() {
            return Err(AppointmentError::StoreFailure("Failed to check availability".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentStore for FakeAppointmentStore {
    async fn create(&self, patient_id: &str, booking: &NewAppointment) -> Result<Appointment, AppointmentError> {
        if *self.failing.lock().unwrap() {
            return Err(AppointmentError::StoreFailure("Failed to book appointment".to_string()));
        }
        let mut created = appointment(patient_id, booking.date, booking.time, AppointmentStatus::Pending);
        created.service_type = booking.service_type.clone();
        created.notes = Some(booking.notes.clone().unwrap_or_default());
        log(&self.events, format!("create {} {}", booking.date, booking.time));
        self.insert(created.clone());
        Ok(created)
    }

    async fn get_by_date(&self, date: NaiveDate) -> Result<Vec<SlotTime>, AppointmentError> {
        self.check()?;
        let taken = self
            .all()
            .into_iter()
            .filter(|a| a.date == date && a.is_active())
            .map(|a| a.time)
            .collect();
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(taken)
    }

    async fn get_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>, AppointmentError> {
        self.check()?;
        let mut rows: Vec<_> = self.all().into_iter().filter(|a| a.patient_id == patient_id).collect();
        rows.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time)));
        Ok(rows)
    }

    async fn get_all(&self, date: Option<NaiveDate>) -> Result<Vec<Appointment>, AppointmentError> {
        self.check()?;
        let mut rows = self.all();
        match date {
            Some(date) => {
                rows.retain(|a| a.date == date);
                rows.sort_by_key(|a| a.time);
            }
            None => rows.sort_by(|a, b| (b.date, b.time).cmp(&(a.date, a.time))),
        }
        Ok(rows)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Appointment>, AppointmentError> {
        self.check()?;
        Ok(self.all().into_iter().find(|a| a.id == id))
    }

    async fn update_status(&self, id: Uuid, status: AppointmentStatus) -> Result<Appointment, AppointmentError> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| AppointmentError::NotFound("Appointment".to_string()))?;
        row.status = status;
        log(&self.events, format!("status {} {}", id, status));
        Ok(row.clone())
    }
}

// ==============================================================================
// CALENDAR
// ==============================================================================

pub struct FakeCalendarStore {
    off_days: Mutex<Vec<ClinicOffDay>>,
    failing: Mutex<bool>,
}

impl FakeCalendarStore {
    pub fn new() -> Self {
        Self {
            off_days: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    pub fn close(&self, date: NaiveDate, reason: Option<&str>) {
        self.off_days.lock().unwrap().push(ClinicOffDay {
            id: Uuid::new_v4().to_string(),
            date,
            reason: reason.map(str::to_string),
        });
    }

    pub fn fail(&self) {
        *self.failing.lock().unwrap() = true;
    }
}

#[async_trait]
impl ClinicCalendarStore for FakeCalendarStore {
    async fn get_off_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<ClinicOffDay>, AppointmentError> {
        if *self.failing.lock().unwrap() {
            return Err(AppointmentError::StoreFailure("Failed to fetch calendar info".to_string()));
        }
        let mut days: Vec<_> = self
            .off_days
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.date >= from && d.date <= to)
            .cloned()
            .collect();
        days.sort_by_key(|d| d.date);
        Ok(days)
    }
}

// ==============================================================================
// PROFILES & RECORDS
// ==============================================================================

pub struct FakeProfileStore {
    profiles: Mutex<HashMap<String, UserProfile>>,
    failing_uids: Mutex<Vec<String>>,
    events: EventLog,
}

impl FakeProfileStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            profiles: Mutex::new(HashMap::new()),
            failing_uids: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn put(&self, profile: UserProfile) {
        self.profiles.lock().unwrap().insert(profile.uid.clone(), profile);
    }

    pub fn get(&self, uid: &str) -> Option<UserProfile> {
        self.profiles.lock().unwrap().get(uid).cloned()
    }

    pub fn fail_for(&self, uid: &str) {
        self.failing_uids.lock().unwrap().push(uid.to_string());
    }
}

#[async_trait]
impl UserProfileStore for FakeProfileStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, PatientError> {
        if self.failing_uids.lock().unwrap().iter().any(|u| u == uid) {
            return Err(PatientError::StoreFailure("Failed to fetch user profile".to_string()));
        }
        Ok(self.get(uid))
    }

    async fn update_display_name(&self, uid: &str, display_name: &str) -> Result<(), PatientError> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles
            .get_mut(uid)
            .ok_or_else(|| PatientError::NotFound("User profile".to_string()))?;
        profile.display_name = Some(display_name.to_string());
        log(&self.events, format!("display_name {}", display_name));
        Ok(())
    }

    async fn search_clients(&self, _term: Option<&str>) -> Result<Vec<UserProfile>, PatientError> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.role == UserRole::Client)
            .cloned()
            .collect())
    }
}

pub struct FakeRecordStore {
    records: Mutex<HashMap<String, PatientRecord>>,
    failing_uids: Mutex<Vec<String>>,
    events: EventLog,
}

impl FakeRecordStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failing_uids: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn put(&self, record: PatientRecord) {
        self.records.lock().unwrap().insert(record.uid.clone(), record);
    }

    pub fn get(&self, uid: &str) -> Option<PatientRecord> {
        self.records.lock().unwrap().get(uid).cloned()
    }

    pub fn fail_for(&self, uid: &str) {
        self.failing_uids.lock().unwrap().push(uid.to_string());
    }
}

#[async_trait]
impl PatientRecordStore for FakeRecordStore {
    async fn get_record(&self, uid: &str) -> Result<Option<PatientRecord>, PatientError> {
        if self.failing_uids.lock().unwrap().iter().any(|u| u == uid) {
            return Err(PatientError::StoreFailure("Failed to fetch record".to_string()));
        }
        Ok(self.get(uid))
    }

    async fn upsert_record(
        &self,
        uid: &str,
        update: PatientRecordUpdate,
        scope: RecordWriteScope,
    ) -> Result<PatientRecord, PatientError> {
        let existing = self.get(uid);
        scoped_patch(uid, &update, existing.as_ref(), scope)?;

        let mut stored = existing.unwrap_or_else(|| record(uid, false));
        if let Some(phone) = update.phone_number {
            stored.phone_number = phone;
        }
        log(&self.events, format!("phone {}", stored.phone_number));
        self.put(stored.clone());
        Ok(stored)
    }
}

// ==============================================================================
// BUNDLE
// ==============================================================================

pub struct Fakes {
    pub appointments: Arc<FakeAppointmentStore>,
    pub calendar: Arc<FakeCalendarStore>,
    pub profiles: Arc<FakeProfileStore>,
    pub records: Arc<FakeRecordStore>,
    pub events: EventLog,
}

impl Fakes {
    pub fn new() -> Self {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        Self {
            appointments: Arc::new(FakeAppointmentStore::new(events.clone())),
            calendar: Arc::new(FakeCalendarStore::new()),
            profiles: Arc::new(FakeProfileStore::new(events.clone())),
            records: Arc::new(FakeRecordStore::new(events.clone())),
            events,
        }
    }

    pub fn stores(&self) -> ClinicStores {
        ClinicStores {
            appointments: self.appointments.clone(),
            calendar: self.calendar.clone(),
            profiles: self.profiles.clone(),
            records: self.records.clone(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}
