use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::Expr,
};

use crate::auth::credential::PasswordRecord;
use crate::entities::{accounts, prelude::*};

/// Full account row, secrets included. Internal to the server; never
/// serialized. HTTP-facing code maps this onto a DTO that carries no
/// password material.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    pub hash_cost: i32,
    pub enabled: bool,
    pub superuser: bool,
    pub account_created: String,
    pub current_token: String,
    pub token_created: Option<String>,
    pub token_last_used: Option<String>,
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            password_salt: model.password_salt,
            hash_cost: model.hash_cost,
            enabled: model.enabled,
            superuser: model.superuser,
            account_created: model.account_created,
            current_token: model.current_token,
            token_created: model.token_created,
            token_last_used: model.token_last_used,
        }
    }
}

/// Fields for a new account row.
#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub password: PasswordRecord,
    pub enabled: bool,
    pub superuser: bool,
}

/// Partial update applied to an existing account. `None` fields are left
/// untouched.
#[derive(Debug, Default)]
pub struct AccountChanges {
    pub password: Option<PasswordRecord>,
    pub enabled: Option<bool>,
    pub superuser: Option<bool>,
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, new: NewAccount) -> Result<Account> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = accounts::ActiveModel {
            username: Set(new.username),
            password_hash: Set(new.password.hash),
            password_salt: Set(new.password.salt),
            hash_cost: Set(new.password.cost as i32),
            enabled: Set(new.enabled),
            superuser: Set(new.superuser),
            account_created: Set(now),
            current_token: Set(String::new()),
            token_created: Set(None),
            token_last_used: Set(None),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert account")?;

        Ok(Account::from(model))
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        let account = Accounts::find()
            .filter(accounts::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query account by username")?;

        Ok(account.map(Account::from))
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Account>> {
        let account = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by id")?;

        Ok(account.map(Account::from))
    }

    /// Look up the account holding the presented session token. Callers are
    /// expected to have rejected empty tokens already; an empty
    /// `current_token` column means "no session" and must never match.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Account>> {
        if token.is_empty() {
            return Ok(None);
        }

        let account = Accounts::find()
            .filter(accounts::Column::CurrentToken.eq(token))
            .one(&self.conn)
            .await
            .context("Failed to query account by token")?;

        Ok(account.map(Account::from))
    }

    pub async fn list(&self) -> Result<Vec<Account>> {
        let rows = Accounts::find()
            .order_by_asc(accounts::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list accounts")?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    pub async fn update(&self, id: i32, changes: AccountChanges) -> Result<Option<Account>> {
        let Some(existing) = Accounts::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for update")?
        else {
            return Ok(None);
        };

        let mut active: accounts::ActiveModel = existing.into();

        if let Some(record) = changes.password {
            active.password_hash = Set(record.hash);
            active.password_salt = Set(record.salt);
            active.hash_cost = Set(record.cost as i32);
        }
        if let Some(enabled) = changes.enabled {
            active.enabled = Set(enabled);
        }
        if let Some(superuser) = changes.superuser {
            active.superuser = Set(superuser);
        }

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update account")?;

        Ok(Some(Account::from(model)))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = Accounts::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete account")?;

        Ok(result.rows_affected > 0)
    }

    /// Install a freshly issued token in a single UPDATE keyed by username.
    /// Overwrites whatever token was live before, so at most one token
    /// resolves per account even under concurrent authentication attempts.
    pub async fn swap_token(&self, username: &str, token: &str, stamp: &str) -> Result<bool> {
        let result = Accounts::update_many()
            .col_expr(accounts::Column::CurrentToken, Expr::value(token))
            .col_expr(accounts::Column::TokenCreated, Expr::value(stamp))
            .col_expr(accounts::Column::TokenLastUsed, Expr::value(stamp))
            .filter(accounts::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to install session token")?;

        Ok(result.rows_affected > 0)
    }

    /// Record that the live token was just used, without touching any other
    /// column.
    pub async fn touch_token(&self, username: &str, stamp: &str) -> Result<()> {
        Accounts::update_many()
            .col_expr(accounts::Column::TokenLastUsed, Expr::value(stamp))
            .filter(accounts::Column::Username.eq(username))
            .exec(&self.conn)
            .await
            .context("Failed to update token last-used time")?;

        Ok(())
    }
}
