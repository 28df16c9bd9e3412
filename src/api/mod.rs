use axum::{Router, http::HeaderValue, routing::post};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::Authorizer;
use crate::config::{Config, SecurityConfig};
use crate::db::Store;

pub mod accounts;
pub mod auth;
pub mod bodyweight;
pub mod dispatch;
mod error;

pub use dispatch::{HasOwner, RestResource, dispatch, resource_routes};
pub use error::{ApiError, INVALID_CREDENTIALS};

#[derive(Clone)]
pub struct AppState {
    store: Store,
    authorizer: Authorizer,
    config: Config,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub const fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }

    #[must_use]
    pub const fn security(&self) -> &SecurityConfig {
        &self.config.security
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(Arc::new(AppState {
        authorizer: Authorizer::new(store.clone()),
        store,
        config,
    }))
}

/// Assemble the HTTP surface: the authentication endpoint plus one
/// dispatcher-backed route set per resource.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .route("/authenticate", post(auth::authenticate))
        .merge(resource_routes::<accounts::AccountResource>())
        .merge(resource_routes::<bodyweight::BodyweightResource>())
        .with_state(state)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
