//! Student entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A student enrolled at the school.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// School-assigned identifier. Not unique in the store.
    #[sea_orm(indexed)]
    pub school_id: String,

    pub name: String,

    /// Free-form class label such as `5A`.
    #[sea_orm(indexed)]
    pub class_name: String,

    /// Cached flag, true once any vaccination is recorded. Never reset.
    #[sea_orm(default_value = false)]
    pub vaccinated: bool,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vaccination::Entity")]
    Vaccination,
}

impl Related<super::vaccination::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vaccination.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
