use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    /// Argon2id password hash (PHC string)
    pub password_hash: String,

    /// Salt applied when the password was hashed
    pub password_salt: String,

    /// Argon2 time cost in force when the hash was computed
    pub hash_cost: i32,

    pub enabled: bool,

    pub superuser: bool,

    pub account_created: String,

    /// Active session token; empty string means no live session
    #[sea_orm(default_value = "")]
    pub current_token: String,

    pub token_created: Option<String>,

    pub token_last_used: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
