use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::token::token_lifespan;
use crate::db::{Account, Store};

#[derive(Debug, Error)]
pub enum AuthzError {
    /// Unknown, expired, or otherwise unresolvable token. Rendered the same
    /// as any other bad credential so callers learn nothing about why.
    #[error("invalid or expired token")]
    InvalidToken,

    /// The token resolved, but the actor may not touch the requested owner.
    #[error("insufficient privilege for the requested owner")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Outcome of a successful authorization: who is acting, and which owner id
/// the request is allowed to operate on.
#[derive(Debug)]
pub struct Authorized {
    pub actor: Account,
    pub owner_id: i32,
}

/// Maps bearer tokens to acting identities and decides access to owned data.
/// Every handler that reads or mutates owner-scoped rows goes through here.
#[derive(Clone)]
pub struct Authorizer {
    store: Store,
}

impl Authorizer {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }

    /// Resolve a presented token to its account. Returns `None` for empty,
    /// unknown, disabled, or expired tokens; a successful resolution stamps
    /// the token's last-used time.
    pub async fn resolve_token(&self, token: &str) -> anyhow::Result<Option<Account>> {
        if token.is_empty() {
            return Ok(None);
        }

        let Some(mut account) = self.store.get_account_by_token(token).await? else {
            return Ok(None);
        };

        if !account.enabled {
            return Ok(None);
        }

        if !token_is_fresh(account.token_created.as_deref(), Utc::now()) {
            return Ok(None);
        }

        self.store.touch_token(&account.username).await?;
        account.token_last_used = Some(Utc::now().to_rfc3339());

        Ok(Some(account))
    }

    /// Decide whether the token's holder may act on `target_owner`'s data.
    ///
    /// A target of 0 means "unspecified" and defaults to the actor's own id.
    /// Acting on yourself is always allowed; acting on anyone else requires
    /// the superuser flag. This is the only cross-account access path.
    pub async fn authorize_as(
        &self,
        token: &str,
        target_owner: i32,
    ) -> Result<Authorized, AuthzError> {
        let actor = self
            .resolve_token(token)
            .await?
            .ok_or(AuthzError::InvalidToken)?;

        let owner_id = if target_owner == 0 {
            actor.id
        } else {
            target_owner
        };

        if owner_id == actor.id || actor.superuser {
            Ok(Authorized { actor, owner_id })
        } else {
            Err(AuthzError::Forbidden)
        }
    }
}

/// A token is fresh while `now - token_created < TOKEN_LIFESPAN`. A missing
/// or unparseable creation stamp counts as expired.
fn token_is_fresh(token_created: Option<&str>, now: DateTime<Utc>) -> bool {
    let Some(raw) = token_created else {
        return false;
    };
    let Ok(created) = DateTime::parse_from_rfc3339(raw) else {
        return false;
    };
    now.signed_duration_since(created.with_timezone(&Utc)) < token_lifespan()
}
