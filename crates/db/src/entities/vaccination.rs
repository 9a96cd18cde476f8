//! Vaccination event entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A dose administered to a student under a drive.
///
/// Owned by its student. The drive is a weak reference: no foreign key is
/// declared, so an event outlives the drive it points to.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vaccination")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning student's system ID.
    #[sea_orm(indexed)]
    pub student_id: String,

    pub drive_id: String,

    /// Copy of the vaccine name at recording time.
    #[sea_orm(indexed)]
    pub vaccine_name: String,

    #[sea_orm(indexed)]
    pub administered_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::drive::Entity",
        from = "Column::DriveId",
        to = "super::drive::Column::Id"
    )]
    Drive,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::drive::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Drive.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
