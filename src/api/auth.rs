use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use std::sync::Arc;
use tokio::task;

use super::accounts::AccountResponse;
use super::{ApiError, AppState};
use crate::auth::{format_auth_header, verify_password};

/// Pull username/password out of an HTTP Basic `Authorization` header.
/// Anything malformed comes back as `None`; the caller renders all of it as
/// the one generic credential failure.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = raw.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// POST /authenticate
///
/// One-shot authentication state machine: extract Basic credentials, verify
/// against the stored hash, and issue a fresh session token. Unknown
/// username, disabled account, and wrong password all produce the identical
/// 401 so the response confirms nothing. On success the new token rides in
/// the `Authorization` response header and in the account body.
///
/// Exactly one row update on success; no writes on any failure path.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let Some((username, password)) = basic_credentials(&headers) else {
        return Err(ApiError::InvalidCredentials);
    };
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::InvalidCredentials);
    }

    let Some(mut account) = state.store().get_account_by_username(&username).await? else {
        return Err(ApiError::InvalidCredentials);
    };

    if !account.enabled {
        return Err(ApiError::InvalidCredentials);
    }

    // Argon2 verification is CPU-bound; keep it off the async runtime.
    let stored_hash = account.password_hash.clone();
    let valid = task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::Internal(format!("password verification task panicked: {e}")))??;

    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    state.store().issue_token(&mut account).await?;
    tracing::info!("Session issued for {}", account.username);

    let header_value = HeaderValue::from_str(&format_auth_header(&account.current_token))
        .map_err(|e| ApiError::Internal(format!("token header encoding failed: {e}")))?;

    let mut response = Json(AccountResponse::from(&account)).into_response();
    response
        .headers_mut()
        .insert(header::AUTHORIZATION, header_value);

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_well_formed_basic_auth() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:Secret123!");
        let headers = headers_with(&format!("Basic {encoded}"));
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "Secret123!".to_string()))
        );
    }

    #[test]
    fn password_may_contain_colons() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:a:b:c");
        let headers = headers_with(&format!("Basic {encoded}"));
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "a:b:c".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(basic_credentials(&HeaderMap::new()), None);
        assert_eq!(basic_credentials(&headers_with("Basic not-base64!!")), None);
        assert_eq!(basic_credentials(&headers_with("token token=abc")), None);

        // decodes, but has no colon separator
        let encoded = base64::engine::general_purpose::STANDARD.encode("no-separator");
        assert_eq!(
            basic_credentials(&headers_with(&format!("Basic {encoded}"))),
            None
        );
    }
}
