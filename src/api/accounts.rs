use async_trait::async_trait;
use axum::{
    Json,
    extract::Request,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task;

use super::dispatch::{RestResource, read_json, session_token, target_id};
use super::{ApiError, AppState};
use crate::auth::hash_password;
use crate::db::{Account, AccountChanges, NewAccount};

/// External representation of an account. Password hash, salt, and cost
/// never appear here.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i32,
    pub username: String,
    pub account_created: String,
    pub enabled: bool,
    pub superuser: bool,
    pub current_token: String,
    pub token_created: Option<String>,
    pub token_last_used: Option<String>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            account_created: account.account_created.clone(),
            enabled: account.enabled,
            superuser: account.superuser,
            current_token: account.current_token.clone(),
            token_created: account.token_created.clone(),
            token_last_used: account.token_last_used.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub superuser: bool,
}

const fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub password: Option<String>,
    pub enabled: Option<bool>,
    pub superuser: Option<bool>,
}

/// The account resource at /users/. Account creation is superuser-gated;
/// reads and mutations of an individual account go through the owner check,
/// so a non-superuser can only ever touch their own row.
pub struct AccountResource;

#[async_trait]
impl RestResource for AccountResource {
    fn resource_name() -> &'static str {
        "users"
    }

    async fn create(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();

        let authz = state.authorizer().authorize_as(&token, 0).await?;
        if !authz.actor.superuser {
            return Err(ApiError::Unauthorized(
                "account creation requires superuser privilege".to_string(),
            ));
        }

        let body: CreateAccountRequest = read_json(req).await?;

        let username = body.username.trim().to_string();
        if username.is_empty() {
            return Err(ApiError::BadRequest("username is required".to_string()));
        }
        if body.password.is_empty() {
            return Err(ApiError::BadRequest("password is required".to_string()));
        }

        if state
            .store()
            .get_account_by_username(&username)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(format!(
                "username '{username}' is already taken"
            )));
        }

        let password = body.password;
        let security = state.security().clone();
        let record = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .map_err(|e| ApiError::Internal(format!("password hashing task panicked: {e}")))??;

        let account = state
            .store()
            .create_account(NewAccount {
                username,
                password: record,
                enabled: body.enabled,
                superuser: body.superuser,
            })
            .await?;

        tracing::info!("Account created: {} (id {})", account.username, account.id);
        Ok(Json(AccountResponse::from(&account)).into_response())
    }

    async fn retrieve(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();
        let Some(id) = target_id(&req, Self::resource_name())? else {
            return Err(ApiError::BadRequest("account id required".to_string()));
        };

        state.authorizer().authorize_as(&token, id).await?;

        let account = state
            .store()
            .get_account_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("account {id} not found")))?;

        Ok(Json(AccountResponse::from(&account)).into_response())
    }

    async fn update(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();
        let Some(id) = target_id(&req, Self::resource_name())? else {
            return Err(ApiError::BadRequest("account id required".to_string()));
        };

        let authz = state.authorizer().authorize_as(&token, id).await?;

        let body: UpdateAccountRequest = read_json(req).await?;

        // Flipping enabled/superuser is an administrative action; self-service
        // is limited to password changes.
        if (body.enabled.is_some() || body.superuser.is_some()) && !authz.actor.superuser {
            return Err(ApiError::Unauthorized(
                "privilege changes require superuser".to_string(),
            ));
        }

        let mut changes = AccountChanges {
            enabled: body.enabled,
            superuser: body.superuser,
            ..Default::default()
        };

        if let Some(password) = body.password {
            if password.is_empty() {
                return Err(ApiError::BadRequest("password must not be empty".to_string()));
            }
            let security = state.security().clone();
            let record = task::spawn_blocking(move || hash_password(&password, &security))
                .await
                .map_err(|e| ApiError::Internal(format!("password hashing task panicked: {e}")))??;
            changes.password = Some(record);
        }

        let account = state
            .store()
            .update_account(id, changes)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("account {id} not found")))?;

        tracing::info!("Account updated: {} (id {})", account.username, account.id);
        Ok(Json(AccountResponse::from(&account)).into_response())
    }

    async fn delete(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let token = session_token(&req)?.to_string();
        let Some(id) = target_id(&req, Self::resource_name())? else {
            return Err(ApiError::BadRequest("account id required".to_string()));
        };

        state.authorizer().authorize_as(&token, id).await?;

        let account = state
            .store()
            .get_account_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("account {id} not found")))?;

        // Removing the row also kills any outstanding session token.
        if !state.store().delete_account(id).await? {
            return Err(ApiError::NotFound(format!("account {id} not found")));
        }

        tracing::info!("Account deleted: {} (id {})", account.username, account.id);
        Ok(Json(AccountResponse::from(&account)).into_response())
    }
}
