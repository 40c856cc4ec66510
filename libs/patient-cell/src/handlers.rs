use std::sync::Arc;
use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;

use crate::models::{ClientSearchQuery, PatientError, PatientRecordUpdate, RecordWriteScope};
use crate::services::{
    PatientRecordStore, SupabasePatientRecordStore, SupabaseUserProfileStore, UserProfileStore,
};

impl From<PatientError> for AppError {
    fn from(e: PatientError) -> Self {
        match e {
            PatientError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            PatientError::FieldNotWritable(_) => AppError::Forbidden(e.to_string()),
            PatientError::Unauthorized => AppError::Forbidden(e.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::StoreFailure(msg) => AppError::Database(msg),
        }
    }
}

fn stores(config: &AppConfig, token: &str) -> (SupabaseUserProfileStore, SupabasePatientRecordStore) {
    let supabase = Arc::new(SupabaseClient::new(config));
    (
        SupabaseUserProfileStore::new(Arc::clone(&supabase), token),
        SupabasePatientRecordStore::new(supabase, token),
    )
}

/// Role from the caller's stored profile; token claims are not trusted for roles.
async fn caller_role(profiles: &dyn UserProfileStore, user: &User) -> Result<UserRole, AppError> {
    profiles
        .get_profile(&user.id)
        .await?
        .map(|profile| profile.role)
        .ok_or_else(|| AppError::NotFound("User profile not found".to_string()))
}

#[axum::debug_handler]
pub async fn get_patient_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(uid): Path<String>,
) -> Result<Json<Value>, AppError> {
    let (profiles, records) = stores(&config, auth.token());

    if uid != user.id && !caller_role(&profiles, &user).await?.is_staff() {
        return Err(AppError::Forbidden("Not authorized to view this record".to_string()));
    }

    let record = records.get_record(&uid).await?
        .ok_or_else(|| AppError::NotFound("Record not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "record": record
    })))
}

#[axum::debug_handler]
pub async fn update_patient_record(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(uid): Path<String>,
    Json(update): Json<PatientRecordUpdate>,
) -> Result<Json<Value>, AppError> {
    let (profiles, records) = stores(&config, auth.token());

    let scope = RecordWriteScope::for_role(caller_role(&profiles, &user).await?);
    if scope == RecordWriteScope::ClientSelfService && uid != user.id {
        return Err(AppError::Forbidden("Not authorized to update this record".to_string()));
    }

    let record = records.upsert_record(&uid, update, scope).await?;

    Ok(Json(json!({
        "success": true,
        "record": record
    })))
}

#[axum::debug_handler]
pub async fn search_clients(
    State(config): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<ClientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let (profiles, _) = stores(&config, auth.token());

    if !caller_role(&profiles, &user).await?.is_staff() {
        return Err(AppError::Forbidden("Staff access required".to_string()));
    }

    let clients = profiles.search_clients(query.q.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "total": clients.len(),
        "clients": clients
    })))
}
