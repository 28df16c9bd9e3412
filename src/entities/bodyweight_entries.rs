use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bodyweight_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning account id
    pub user_id: i32,

    pub recorded_at: String,

    /// Bodyweight in kilograms
    pub weight: f64,

    pub comment: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
