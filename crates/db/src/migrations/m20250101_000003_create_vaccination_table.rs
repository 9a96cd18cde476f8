//! Create `vaccination` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vaccination::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vaccination::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Vaccination::StudentId)
                            .string_len(32)
                            .not_null(),
                    )
                    // Weak reference, no foreign key
                    .col(ColumnDef::new(Vaccination::DriveId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Vaccination::VaccineName)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vaccination::AdministeredAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vaccination_student")
                            .from(Vaccination::Table, Vaccination::StudentId)
                            .to(Student::Table, Student::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one event per (student, drive, vaccine)
        manager
            .create_index(
                Index::create()
                    .name("idx_vaccination_student_drive_vaccine")
                    .table(Vaccination::Table)
                    .col(Vaccination::StudentId)
                    .col(Vaccination::DriveId)
                    .col(Vaccination::VaccineName)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Report filter
        manager
            .create_index(
                Index::create()
                    .name("idx_vaccination_vaccine_name")
                    .table(Vaccination::Table)
                    .col(Vaccination::VaccineName)
                    .to_owned(),
            )
            .await?;

        // Report ordering
        manager
            .create_index(
                Index::create()
                    .name("idx_vaccination_administered_at")
                    .table(Vaccination::Table)
                    .col(Vaccination::AdministeredAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vaccination::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vaccination {
    Table,
    Id,
    StudentId,
    DriveId,
    VaccineName,
    AdministeredAt,
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
}
