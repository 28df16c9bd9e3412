use async_trait::async_trait;
use axum::{
    Json,
    extract::Request,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::dispatch::{HasOwner, RestResource, read_json, session_token, target_id};
use super::{ApiError, AppState};
use crate::db::{BodyweightChanges, BodyweightEntry};

#[derive(Debug, Serialize)]
pub struct BodyweightResponse {
    pub id: i32,
    pub user_id: i32,
    pub recorded_at: String,
    pub weight: f64,
    pub comment: Option<String>,
}

impl From<&BodyweightEntry> for BodyweightResponse {
    fn from(entry: &BodyweightEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            recorded_at: entry.recorded_at.clone(),
            weight: entry.weight,
            comment: entry.comment.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BodyweightCreateRequest {
    /// Target owner; 0 (or absent) means the acting account.
    #[serde(default)]
    pub user_id: i32,
    pub recorded_at: Option<String>,
    pub weight: f64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl HasOwner for BodyweightCreateRequest {
    fn owner(&self) -> i32 {
        self.user_id
    }

    fn set_owner(&mut self, id: i32) {
        self.user_id = id;
    }
}

#[derive(Debug, Deserialize)]
pub struct BodyweightUpdateRequest {
    pub recorded_at: Option<String>,
    pub weight: Option<f64>,
    pub comment: Option<String>,
}

fn validate_weight(weight: f64) -> Result<(), ApiError> {
    if !weight.is_finite() || weight <= 0.0 || weight >= 1000.0 {
        return Err(ApiError::BadRequest(
            "weight must be a positive number below 1000".to_string(),
        ));
    }
    Ok(())
}

fn validate_stamp(raw: &str) -> Result<(), ApiError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|_| ())
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp '{raw}'")))
}

/// The bodyweight metric at /bodyweight/. Every verb authorizes against the
/// record's owner; creation stamps the owner resolved by the `Authorizer`
/// onto the body, so the request cannot plant records on another account.
pub struct BodyweightResource;

#[async_trait]
impl RestResource for BodyweightResource {
    fn resource_name() -> &'static str {
        "bodyweight"
    }

    async fn create(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();
        let mut body: BodyweightCreateRequest = read_json(req).await?;

        let authz = state.authorizer().authorize_as(&token, body.owner()).await?;
        body.set_owner(authz.owner_id);

        validate_weight(body.weight)?;

        let recorded_at = match body.recorded_at {
            Some(ref raw) => {
                validate_stamp(raw)?;
                raw.clone()
            }
            None => chrono::Utc::now().to_rfc3339(),
        };

        let entry = state
            .store()
            .add_bodyweight(
                body.owner(),
                &recorded_at,
                body.weight,
                body.comment.as_deref(),
            )
            .await?;

        tracing::info!(
            "Bodyweight entry {} recorded for account {}",
            entry.id,
            entry.user_id
        );
        Ok(Json(BodyweightResponse::from(&entry)).into_response())
    }

    async fn retrieve(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();

        let Some(id) = target_id(&req, Self::resource_name())? else {
            // Collection read: the caller's own log, newest first.
            let authz = state.authorizer().authorize_as(&token, 0).await?;
            let entries = state.store().list_bodyweight_for(authz.owner_id).await?;
            let dtos: Vec<BodyweightResponse> =
                entries.iter().map(BodyweightResponse::from).collect();
            return Ok(Json(dtos).into_response());
        };

        let Some(entry) = state.store().get_bodyweight(id).await? else {
            // Still require a live token before admitting the id is unknown.
            state.authorizer().authorize_as(&token, 0).await?;
            return Err(ApiError::NotFound(format!("bodyweight entry {id} not found")));
        };

        state.authorizer().authorize_as(&token, entry.user_id).await?;

        Ok(Json(BodyweightResponse::from(&entry)).into_response())
    }

    async fn update(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();
        let Some(id) = target_id(&req, Self::resource_name())? else {
            return Err(ApiError::BadRequest("bodyweight entry id required".to_string()));
        };

        let body: BodyweightUpdateRequest = read_json(req).await?;

        let Some(existing) = state.store().get_bodyweight(id).await? else {
            state.authorizer().authorize_as(&token, 0).await?;
            return Err(ApiError::NotFound(format!("bodyweight entry {id} not found")));
        };

        state
            .authorizer()
            .authorize_as(&token, existing.user_id)
            .await?;

        if let Some(weight) = body.weight {
            validate_weight(weight)?;
        }
        if let Some(raw) = body.recorded_at.as_deref() {
            validate_stamp(raw)?;
        }

        let changes = BodyweightChanges {
            recorded_at: body.recorded_at,
            weight: body.weight,
            // An explicit empty string clears the comment.
            comment: body
                .comment
                .map(|c| if c.is_empty() { None } else { Some(c) }),
        };

        let entry = state
            .store()
            .update_bodyweight(id, changes)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("bodyweight entry {id} not found")))?;

        Ok(Json(BodyweightResponse::from(&entry)).into_response())
    }

    async fn delete(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();
        let Some(id) = target_id(&req, Self::resource_name())? else {
            return Err(ApiError::BadRequest("bodyweight entry id required".to_string()));
        };

        let Some(entry) = state.store().get_bodyweight(id).await? else {
            state.authorizer().authorize_as(&token, 0).await?;
            return Err(ApiError::NotFound(format!("bodyweight entry {id} not found")));
        };

        state.authorizer().authorize_as(&token, entry.user_id).await?;

        if !state.store().remove_bodyweight(id).await? {
            return Err(ApiError::NotFound(format!("bodyweight entry {id} not found")));
        }

        tracing::info!(
            "Bodyweight entry {} deleted from account {}",
            entry.id,
            entry.user_id
        );
        Ok(Json(BodyweightResponse::from(&entry)).into_response())
    }
}
