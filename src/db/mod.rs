use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{Account, AccountChanges, NewAccount};
pub use repositories::bodyweight::{BodyweightChanges, BodyweightEntry};

use crate::auth::token::{TOKEN_BYTES, generate_token};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn bodyweight_repo(&self) -> repositories::bodyweight::BodyweightRepository {
        repositories::bodyweight::BodyweightRepository::new(self.conn.clone())
    }

    // ========== Accounts ==========

    pub async fn create_account(&self, new: NewAccount) -> Result<Account> {
        self.account_repo().create(new).await
    }

    pub async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.account_repo().get_by_username(username).await
    }

    pub async fn get_account_by_id(&self, id: i32) -> Result<Option<Account>> {
        self.account_repo().get_by_id(id).await
    }

    pub async fn get_account_by_token(&self, token: &str) -> Result<Option<Account>> {
        self.account_repo().get_by_token(token).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.account_repo().list().await
    }

    pub async fn update_account(&self, id: i32, changes: AccountChanges) -> Result<Option<Account>> {
        self.account_repo().update(id, changes).await
    }

    pub async fn delete_account(&self, id: i32) -> Result<bool> {
        self.account_repo().delete(id).await
    }

    /// Issue a fresh session token for the account and persist it in one
    /// UPDATE. The previous token stops resolving the moment the swap lands;
    /// the in-memory account is updated to match the row.
    pub async fn issue_token(&self, account: &mut Account) -> Result<()> {
        let token = generate_token(TOKEN_BYTES)?;
        let stamp = chrono::Utc::now().to_rfc3339();

        let swapped = self
            .account_repo()
            .swap_token(&account.username, &token, &stamp)
            .await?;
        if !swapped {
            anyhow::bail!("account '{}' vanished during token issue", account.username);
        }

        account.current_token = token;
        account.token_created = Some(stamp.clone());
        account.token_last_used = Some(stamp);
        Ok(())
    }

    pub async fn touch_token(&self, username: &str) -> Result<()> {
        let stamp = chrono::Utc::now().to_rfc3339();
        self.account_repo().touch_token(username, &stamp).await
    }

    // ========== Bodyweight ==========

    pub async fn add_bodyweight(
        &self,
        user_id: i32,
        recorded_at: &str,
        weight: f64,
        comment: Option<&str>,
    ) -> Result<BodyweightEntry> {
        self.bodyweight_repo()
            .add(user_id, recorded_at, weight, comment)
            .await
    }

    pub async fn get_bodyweight(&self, id: i32) -> Result<Option<BodyweightEntry>> {
        self.bodyweight_repo().get(id).await
    }

    pub async fn list_bodyweight_for(&self, user_id: i32) -> Result<Vec<BodyweightEntry>> {
        self.bodyweight_repo().list_for(user_id).await
    }

    pub async fn update_bodyweight(
        &self,
        id: i32,
        changes: BodyweightChanges,
    ) -> Result<Option<BodyweightEntry>> {
        self.bodyweight_repo().update(id, changes).await
    }

    pub async fn remove_bodyweight(&self, id: i32) -> Result<bool> {
        self.bodyweight_repo().remove(id).await
    }
}
