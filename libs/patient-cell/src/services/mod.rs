pub mod profile;
pub mod record;

pub use profile::{SupabaseUserProfileStore, UserProfileStore};
pub use record::{phone_number_error, scoped_patch, PatientRecordStore, SupabasePatientRecordStore};
