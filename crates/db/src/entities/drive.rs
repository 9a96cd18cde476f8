//! Vaccination drive entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A vaccination drive scheduled at a location and instant.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "drive")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    pub vaccine_name: String,

    /// Scheduled instant. Unique together with `location`.
    #[sea_orm(indexed)]
    pub date: DateTimeWithTimeZone,

    pub location: String,

    pub available_doses: i32,

    /// Class labels this drive is meant for (JSON array of strings).
    #[sea_orm(column_type = "JsonBinary")]
    pub applicable_classes: Json,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Applicable class labels as strings; malformed JSON yields an empty list.
    #[must_use]
    pub fn class_labels(&self) -> Vec<String> {
        serde_json::from_value(self.applicable_classes.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
