//! Create `drive` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Drive::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Drive::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Drive::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Drive::VaccineName).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Drive::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Drive::Location).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Drive::AvailableDoses)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Drive::ApplicableClasses)
                            .json_binary()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Drive::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Drive::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // One drive per (date, location)
        manager
            .create_index(
                Index::create()
                    .name("idx_drive_date_location")
                    .table(Drive::Table)
                    .col(Drive::Date)
                    .col(Drive::Location)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Drive::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Drive {
    Table,
    Id,
    Title,
    VaccineName,
    Date,
    Location,
    AvailableDoses,
    ApplicableClasses,
    CreatedAt,
    UpdatedAt,
}
