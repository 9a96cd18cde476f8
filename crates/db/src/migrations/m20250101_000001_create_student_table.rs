//! Create `student` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Student::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Student::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Student::SchoolId).string_len(64).not_null())
                    .col(ColumnDef::new(Student::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Student::ClassName).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Student::Vaccinated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Student::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Student::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Exact-match search filters
        manager
            .create_index(
                Index::create()
                    .name("idx_student_school_id")
                    .table(Student::Table)
                    .col(Student::SchoolId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_student_class_name")
                    .table(Student::Table)
                    .col(Student::ClassName)
                    .to_owned(),
            )
            .await?;

        // Dashboard counts
        manager
            .create_index(
                Index::create()
                    .name("idx_student_vaccinated")
                    .table(Student::Table)
                    .col(Student::Vaccinated)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Student::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Student {
    Table,
    Id,
    SchoolId,
    Name,
    ClassName,
    Vaccinated,
    CreatedAt,
    UpdatedAt,
}
