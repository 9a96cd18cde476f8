//! Drive repository.

use std::sync::Arc;

use crate::entities::{Drive, drive};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use vaxtrack_common::{AppError, AppResult};

use super::map_write_err;

/// Drive repository for database operations.
#[derive(Clone)]
pub struct DriveRepository {
    db: Arc<DatabaseConnection>,
}

impl DriveRepository {
    /// Create a new drive repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a drive by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<drive::Model>> {
        Drive::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a drive by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<drive::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Drive {id} not found")))
    }

    /// Find drives by a set of IDs. Unknown IDs are skipped.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<drive::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Drive::find()
            .filter(drive::Column::Id.is_in(ids.iter().cloned()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List every drive, earliest first.
    pub async fn find_all(&self) -> AppResult<Vec<drive::Model>> {
        Drive::find()
            .order_by_asc(drive::Column::Date)
            .order_by_asc(drive::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List drives scheduled at or after `from`, earliest first.
    pub async fn find_upcoming(&self, from: DateTime<Utc>) -> AppResult<Vec<drive::Model>> {
        Drive::find()
            .filter(drive::Column::Date.gte(from))
            .order_by_asc(drive::Column::Date)
            .order_by_asc(drive::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a drive occupying exactly `(date, location)`, ignoring `exclude_id`.
    pub async fn find_at(
        &self,
        date: DateTime<Utc>,
        location: &str,
        exclude_id: Option<&str>,
    ) -> AppResult<Option<drive::Model>> {
        let mut query = Drive::find()
            .filter(drive::Column::Date.eq(date))
            .filter(drive::Column::Location.eq(location));

        if let Some(id) = exclude_id {
            query = query.filter(drive::Column::Id.ne(id));
        }

        query
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new drive.
    pub async fn create(&self, model: drive::ActiveModel) -> AppResult<drive::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| map_write_err(e, slot_taken))
    }

    /// Update a drive.
    pub async fn update(&self, model: drive::ActiveModel) -> AppResult<drive::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| map_write_err(e, slot_taken))
    }
}

fn slot_taken() -> AppError {
    AppError::Conflict("A drive is already scheduled at this location and time".to_string())
}
