use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{bodyweight_entries, prelude::*};

/// One timestamped bodyweight record with optional comment.
#[derive(Debug, Clone)]
pub struct BodyweightEntry {
    pub id: i32,
    pub user_id: i32,
    pub recorded_at: String,
    pub weight: f64,
    pub comment: Option<String>,
}

impl From<bodyweight_entries::Model> for BodyweightEntry {
    fn from(model: bodyweight_entries::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            recorded_at: model.recorded_at,
            weight: model.weight,
            comment: model.comment,
        }
    }
}

#[derive(Debug, Default)]
pub struct BodyweightChanges {
    pub recorded_at: Option<String>,
    pub weight: Option<f64>,
    pub comment: Option<Option<String>>,
}

pub struct BodyweightRepository {
    conn: DatabaseConnection,
}

impl BodyweightRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn add(
        &self,
        user_id: i32,
        recorded_at: &str,
        weight: f64,
        comment: Option<&str>,
    ) -> Result<BodyweightEntry> {
        let active = bodyweight_entries::ActiveModel {
            user_id: Set(user_id),
            recorded_at: Set(recorded_at.to_string()),
            weight: Set(weight),
            comment: Set(comment.map(ToString::to_string)),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert bodyweight entry")?;

        Ok(BodyweightEntry::from(model))
    }

    pub async fn get(&self, id: i32) -> Result<Option<BodyweightEntry>> {
        let entry = BodyweightEntries::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query bodyweight entry")?;

        Ok(entry.map(BodyweightEntry::from))
    }

    pub async fn list_for(&self, user_id: i32) -> Result<Vec<BodyweightEntry>> {
        let rows = BodyweightEntries::find()
            .filter(bodyweight_entries::Column::UserId.eq(user_id))
            .order_by_desc(bodyweight_entries::Column::RecordedAt)
            .all(&self.conn)
            .await
            .context("Failed to list bodyweight entries")?;

        Ok(rows.into_iter().map(BodyweightEntry::from).collect())
    }

    pub async fn update(
        &self,
        id: i32,
        changes: BodyweightChanges,
    ) -> Result<Option<BodyweightEntry>> {
        let Some(existing) = BodyweightEntries::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query bodyweight entry for update")?
        else {
            return Ok(None);
        };

        let mut active: bodyweight_entries::ActiveModel = existing.into();

        if let Some(recorded_at) = changes.recorded_at {
            active.recorded_at = Set(recorded_at);
        }
        if let Some(weight) = changes.weight {
            active.weight = Set(weight);
        }
        if let Some(comment) = changes.comment {
            active.comment = Set(comment);
        }

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update bodyweight entry")?;

        Ok(Some(BodyweightEntry::from(model)))
    }

    pub async fn remove(&self, id: i32) -> Result<bool> {
        let result = BodyweightEntries::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete bodyweight entry")?;

        Ok(result.rows_affected > 0)
    }
}
