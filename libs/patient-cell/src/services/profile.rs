use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{PatientError, UserProfile};
use crate::services::record::map_store_error;

const DEFAULT_CLIENT_LISTING: usize = 10;
const PREFIX_MATCH_LIMIT: usize = 5;

#[async_trait]
pub trait UserProfileStore: Send + Sync {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, PatientError>;

    async fn update_display_name(&self, uid: &str, display_name: &str) -> Result<(), PatientError>;

    /// Client accounts whose e-mail or display name starts with `term`.
    /// Without a term, the first few clients are listed.
    async fn search_clients(&self, term: Option<&str>) -> Result<Vec<UserProfile>, PatientError>;
}

/// Makes `term` match only as literal text inside a PostgREST `like` filter.
/// `*` is PostgREST's wildcard and has no escaped form, so it is dropped.
pub fn literal_like_term(term: &str) -> String {
    let mut literal = String::with_capacity(term.len());
    for c in term.chars() {
        match c {
            '*' => {}
            '\\' | '%' | '_' => {
                literal.push('\\');
                literal.push(c);
            }
            _ => literal.push(c),
        }
    }
    literal
}

/// Merge result lists keeping the first occurrence of each uid.
pub fn merge_unique(lists: Vec<Vec<UserProfile>>) -> Vec<UserProfile> {
    let mut seen = HashSet::new();
    lists
        .into_iter()
        .flatten()
        .filter(|profile| seen.insert(profile.uid.clone()))
        .collect()
}

pub struct SupabaseUserProfileStore {
    supabase: Arc<SupabaseClient>,
    auth_token: String,
}

impl SupabaseUserProfileStore {
    pub fn new(supabase: Arc<SupabaseClient>, auth_token: &str) -> Self {
        Self {
            supabase,
            auth_token: auth_token.to_string(),
        }
    }

    async fn query_profiles(&self, path: &str) -> Result<Vec<UserProfile>, PatientError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(&self.auth_token),
            None,
        ).await.map_err(|e| map_store_error("Failed to fetch user profile", e))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<UserProfile>, _>>()
            .map_err(|e| map_store_error("Failed to fetch user profile", e.into()))
    }
}

#[async_trait]
impl UserProfileStore for SupabaseUserProfileStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, PatientError> {
        debug!("Fetching user profile: {}", uid);

        let path = format!("/rest/v1/users?uid=eq.{}&limit=1", urlencoding::encode(uid));
        Ok(self.query_profiles(&path).await?.into_iter().next())
    }

    async fn update_display_name(&self, uid: &str, display_name: &str) -> Result<(), PatientError> {
        debug!("Updating display name for user {}", uid);

        let path = format!("/rest/v1/users?uid=eq.{}", urlencoding::encode(uid));
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(&self.auth_token),
            Some(json!({ "display_name": display_name })),
            Some(return_representation()),
        ).await.map_err(|e| map_store_error("Failed to update user profile", e))?;

        if result.is_empty() {
            return Err(PatientError::NotFound("User profile".to_string()));
        }

        info!("Display name updated for user {}", uid);
        Ok(())
    }

    async fn search_clients(&self, term: Option<&str>) -> Result<Vec<UserProfile>, PatientError> {
        let term = term
            .map(|t| literal_like_term(t).trim().to_string())
            .filter(|t| !t.is_empty());

        let Some(term) = term else {
            let path = format!("/rest/v1/users?role=eq.client&limit={}", DEFAULT_CLIENT_LISTING);
            return self.query_profiles(&path).await;
        };

        debug!("Searching clients by prefix: {}", term);

        // PostgREST has no OR across prefix filters on different columns, so
        // e-mail and name are queried concurrently and merged.
        let encoded = urlencoding::encode(&term);
        let email_path = format!(
            "/rest/v1/users?role=eq.client&email=like.{}*&limit={}",
            encoded, PREFIX_MATCH_LIMIT
        );
        let name_path = format!(
            "/rest/v1/users?role=eq.client&display_name=like.{}*&limit={}",
            encoded, PREFIX_MATCH_LIMIT
        );

        let (by_email, by_name) = futures::try_join!(
            self.query_profiles(&email_path),
            self.query_profiles(&name_path),
        )?;

        Ok(merge_unique(vec![by_email, by_name]))
    }
}
