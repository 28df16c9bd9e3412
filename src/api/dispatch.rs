use async_trait::async_trait;
use axum::{
    Router,
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::any,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::{ApiError, AppState};

/// Largest request body any handler will read.
const BODY_LIMIT: usize = 64 * 1024;

/// A resource that can be stamped with its owning account id. Handlers call
/// `set_owner` with the id resolved by the `Authorizer`, so request bodies
/// cannot smuggle records onto another account.
pub trait HasOwner {
    fn owner(&self) -> i32;
    fn set_owner(&mut self, id: i32);
}

/// A REST resource routed by HTTP verb. Implementors provide the handlers
/// for the verbs they support and the path segment they live under; the
/// default bodies answer 405, so unsupported verbs are stated explicitly by
/// omission rather than inherited silently.
///
/// Routing performs no authorization. Each handler decides for itself,
/// delegating owner checks to the `Authorizer`.
#[async_trait]
pub trait RestResource: Send + Sync + 'static {
    /// URL path segment this resource is served under, e.g. "users".
    fn resource_name() -> &'static str;

    async fn create(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let _ = (state, req);
        Err(ApiError::MethodNotAllowed("POST".to_string()))
    }

    async fn retrieve(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let _ = (state, req);
        Err(ApiError::MethodNotAllowed("GET".to_string()))
    }

    async fn update(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let _ = (state, req);
        Err(ApiError::MethodNotAllowed("PUT".to_string()))
    }

    async fn delete(state: Arc<AppState>, req: Request) -> Result<Response, ApiError> {
        let _ = (state, req);
        Err(ApiError::MethodNotAllowed("DELETE".to_string()))
    }
}

/// Route a request to the matching verb handler. Exactly one handler runs
/// per request; any verb outside GET/POST/PUT/DELETE is answered with 405
/// naming the rejected method.
pub async fn dispatch<R: RestResource>(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Response {
    let method = req.method().as_str().to_string();

    let outcome = match method.as_str() {
        "GET" => R::retrieve(state, req).await,
        "POST" => R::create(state, req).await,
        "PUT" => R::update(state, req).await,
        "DELETE" => R::delete(state, req).await,
        _ => Err(ApiError::MethodNotAllowed(method)),
    };

    outcome.unwrap_or_else(IntoResponse::into_response)
}

/// Build the routes for one resource: the collection path and the id path,
/// both fed through `dispatch`. This is the single routing implementation
/// every resource shares.
pub fn resource_routes<R: RestResource>() -> Router<Arc<AppState>> {
    let name = R::resource_name();
    Router::new()
        .route(&format!("/{name}"), any(dispatch::<R>))
        .route(&format!("/{name}/"), any(dispatch::<R>))
        .route(&format!("/{name}/{{id}}"), any(dispatch::<R>))
}

/// Extract the trailing `{id}` path segment, if the request targets an
/// individual record. Collection-level requests yield `None`; a segment
/// that is present but not an integer is a 400.
pub fn target_id(req: &Request, resource: &str) -> Result<Option<i32>, ApiError> {
    let tail = req
        .uri()
        .path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");

    if tail.is_empty() || tail == resource {
        return Ok(None);
    }

    tail.parse::<i32>()
        .map(Some)
        .map_err(|_| ApiError::BadRequest(format!("invalid resource id '{tail}'")))
}

/// Deserialize the request body as JSON, with a size cap.
pub async fn read_json<T: DeserializeOwned>(req: Request) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(req.into_body(), BODY_LIMIT)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read request body: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

/// Pull the bearer session token out of the `Authorization` header.
/// Missing or differently-shaped headers are credential failures, rendered
/// identically to a bad token.
pub fn session_token(req: &Request) -> Result<&str, ApiError> {
    req.headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(crate::auth::parse_auth_header)
        .ok_or(ApiError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http;

    fn request(method: &str, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn target_id_splits_collection_from_record() {
        assert_eq!(target_id(&request("GET", "/users/"), "users").unwrap(), None);
        assert_eq!(target_id(&request("GET", "/users"), "users").unwrap(), None);
        assert_eq!(
            target_id(&request("GET", "/users/42"), "users").unwrap(),
            Some(42)
        );
        assert_eq!(
            target_id(&request("GET", "/users/42/"), "users").unwrap(),
            Some(42)
        );
    }

    #[test]
    fn target_id_rejects_garbage() {
        assert!(target_id(&request("GET", "/users/alice"), "users").is_err());
        assert!(target_id(&request("GET", "/users/1e9"), "users").is_err());
    }

    #[test]
    fn session_token_requires_token_scheme() {
        let mut req = request("GET", "/users/1");
        req.headers_mut().insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("token token=abc123"),
        );
        assert_eq!(session_token(&req).unwrap(), "abc123");

        let mut req = request("GET", "/users/1");
        req.headers_mut().insert(
            http::header::AUTHORIZATION,
            http::HeaderValue::from_static("Bearer abc123"),
        );
        assert!(session_token(&req).is_err());

        assert!(session_token(&request("GET", "/users/1")).is_err());
    }
}
