//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_student_table;
mod m20250101_000002_create_drive_table;
mod m20250101_000003_create_vaccination_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_student_table::Migration),
            Box::new(m20250101_000002_create_drive_table::Migration),
            Box::new(m20250101_000003_create_vaccination_table::Migration),
        ]
    }
}
