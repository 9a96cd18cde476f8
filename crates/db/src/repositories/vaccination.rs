//! Vaccination event repository.

use std::sync::Arc;

use crate::entities::{Vaccination, drive, student, vaccination};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, TransactionTrait,
    prelude::DateTimeWithTimeZone,
};
use vaxtrack_common::{AppError, AppResult};

use super::{StudentRepository, map_write_err};

/// One vaccination event flattened together with its student and drive title.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ReportRow {
    /// School-assigned student ID.
    pub student_id: String,
    pub name: String,
    pub class_name: String,
    pub vaccinated: bool,
    pub vaccine_name: String,
    /// When the dose was administered.
    pub date: DateTimeWithTimeZone,
    /// `None` when the referenced drive no longer exists.
    pub drive_title: Option<String>,
}

/// Vaccination repository for database operations.
#[derive(Clone)]
pub struct VaccinationRepository {
    db: Arc<DatabaseConnection>,
}

impl VaccinationRepository {
    /// Create a new vaccination repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// List a student's events in the order they were administered.
    pub async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<vaccination::Model>> {
        Vaccination::find()
            .filter(vaccination::Column::StudentId.eq(student_id))
            .order_by_asc(vaccination::Column::AdministeredAt)
            .order_by_asc(vaccination::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List the events of several students, grouped by student then time.
    pub async fn find_by_students(
        &self,
        student_ids: &[String],
    ) -> AppResult<Vec<vaccination::Model>> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        Vaccination::find()
            .filter(vaccination::Column::StudentId.is_in(student_ids.iter().cloned()))
            .order_by_asc(vaccination::Column::StudentId)
            .order_by_asc(vaccination::Column::AdministeredAt)
            .order_by_asc(vaccination::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the event recorded for `(student, drive, vaccine)`, if any.
    pub async fn find_event(
        &self,
        student_id: &str,
        drive_id: &str,
        vaccine_name: &str,
    ) -> AppResult<Option<vaccination::Model>> {
        Vaccination::find()
            .filter(vaccination::Column::StudentId.eq(student_id))
            .filter(vaccination::Column::DriveId.eq(drive_id))
            .filter(vaccination::Column::VaccineName.eq(vaccine_name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store a new event for `student` and raise its vaccinated flag.
    ///
    /// Both writes share one transaction, so a failed flag update also
    /// discards the event.
    pub async fn record(
        &self,
        model: vaccination::ActiveModel,
        student: student::Model,
    ) -> AppResult<(vaccination::Model, student::Model)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let event = model.insert(&txn).await.map_err(|e| {
            map_write_err(e, || {
                AppError::Duplicate(
                    "Student already vaccinated for this vaccine in this drive".to_string(),
                )
            })
        })?;
        let student = StudentRepository::mark_vaccinated_on(&txn, student).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok((event, student))
    }

    /// Page through every event, newest first, optionally for one vaccine.
    pub async fn report(
        &self,
        vaccine_name: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<ReportRow>> {
        let mut query = Vaccination::find()
            .select_only()
            .column_as(student::Column::SchoolId, "student_id")
            .column_as(student::Column::Name, "name")
            .column_as(student::Column::ClassName, "class_name")
            .column_as(student::Column::Vaccinated, "vaccinated")
            .column_as(vaccination::Column::VaccineName, "vaccine_name")
            .column_as(vaccination::Column::AdministeredAt, "date")
            .column_as(drive::Column::Title, "drive_title")
            .join(JoinType::InnerJoin, vaccination::Relation::Student.def())
            .join(JoinType::LeftJoin, vaccination::Relation::Drive.def());

        if let Some(vaccine_name) = vaccine_name {
            query = query.filter(vaccination::Column::VaccineName.eq(vaccine_name));
        }

        query
            .order_by_desc(vaccination::Column::AdministeredAt)
            .order_by_desc(vaccination::Column::Id)
            .offset(offset)
            .limit(limit)
            .into_model::<ReportRow>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    fn create_test_event(id: &str, student_id: &str, drive_id: &str) -> vaccination::Model {
        vaccination::Model {
            id: id.to_string(),
            student_id: student_id.to_string(),
            drive_id: drive_id.to_string(),
            vaccine_name: "MMR".to_string(),
            administered_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_student() {
        let events = vec![
            create_test_event("v1", "s1", "d1"),
            create_test_event("v2", "s1", "d2"),
        ];
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([events])
                .into_connection(),
        );

        let repo = VaccinationRepository::new(db);
        let result = repo.find_by_student("s1").await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].drive_id, "d2");
    }

    #[tokio::test]
    async fn test_find_by_students_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = VaccinationRepository::new(db);
        let result = repo.find_by_students(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_find_event_none() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<vaccination::Model>::new()])
                .into_connection(),
        );

        let repo = VaccinationRepository::new(db);
        let result = repo.find_event("s1", "d1", "MMR").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_report_tolerates_missing_drive() {
        let date: DateTimeWithTimeZone = (Utc::now() - Duration::days(1)).into();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "student_id" => Value::from("S1"),
                    "name" => Value::from("Amy"),
                    "class_name" => Value::from("5A"),
                    "vaccinated" => Value::from(true),
                    "vaccine_name" => Value::from("MMR"),
                    "date" => Value::from(date),
                    "drive_title" => Value::String(None),
                }]])
                .into_connection(),
        );

        let repo = VaccinationRepository::new(db);
        let rows = repo.report(Some("MMR"), 0, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_id, "S1");
        assert_eq!(rows[0].date, date);
        assert!(rows[0].drive_title.is_none());
    }

    fn create_test_student(id: &str, vaccinated: bool) -> student::Model {
        student::Model {
            id: id.to_string(),
            school_id: "S1".to_string(),
            name: "Amy".to_string(),
            class_name: "5A".to_string(),
            vaccinated,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn new_event(student_id: &str) -> vaccination::ActiveModel {
        let event = create_test_event("v1", student_id, "d1");
        vaccination::ActiveModel {
            id: sea_orm::Set(event.id),
            student_id: sea_orm::Set(event.student_id),
            drive_id: sea_orm::Set(event.drive_id),
            vaccine_name: sea_orm::Set(event.vaccine_name),
            administered_at: sea_orm::Set(event.administered_at),
        }
    }

    #[tokio::test]
    async fn test_record_commits_event_and_flag() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_event("v1", "s1", "d1")]])
                .append_query_results([[create_test_student("s1", true)]])
                .into_connection(),
        );

        let repo = VaccinationRepository::new(Arc::clone(&db));
        let (event, student) = repo
            .record(new_event("s1"), create_test_student("s1", false))
            .await
            .unwrap();
        assert_eq!(event.drive_id, "d1");
        assert!(student.vaccinated);

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements = log[0].statements();
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0].sql, "BEGIN");
        assert!(statements[1].sql.starts_with(r#"INSERT INTO "vaccination""#));
        assert!(statements[2].sql.starts_with(r#"UPDATE "student""#));
        assert_eq!(statements[3].sql, "COMMIT");
    }

    #[tokio::test]
    async fn test_record_failed_flag_update_rolls_back_event() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_event("v1", "s1", "d1")]])
                .append_query_errors([sea_orm::DbErr::Custom("connection reset".to_string())])
                .into_connection(),
        );

        let repo = VaccinationRepository::new(Arc::clone(&db));
        let result = repo
            .record(new_event("s1"), create_test_student("s1", false))
            .await;
        assert!(matches!(result, Err(AppError::Database(_))));

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements = log[0].statements();
        assert!(statements[1].sql.starts_with(r#"INSERT INTO "vaccination""#));
        assert_eq!(statements.last().unwrap().sql, "ROLLBACK");
    }

    #[tokio::test]
    async fn test_report_orders_newest_first_and_pages() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<std::collections::BTreeMap<&str, Value>>::new()])
                .into_connection(),
        );

        let repo = VaccinationRepository::new(Arc::clone(&db));
        repo.report(Some("MMR"), 4, 2).await.unwrap();

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        let statement = &log[0].statements()[0];
        assert!(statement.sql.contains(
            r#"ORDER BY "vaccination"."administered_at" DESC, "vaccination"."id" DESC"#
        ));
        assert!(statement.sql.ends_with("LIMIT $2 OFFSET $3"));
        assert_eq!(
            statement.values.as_ref().unwrap().0,
            vec![
                Value::from("MMR"),
                Value::BigUnsigned(Some(2)),
                Value::BigUnsigned(Some(4)),
            ]
        );
    }
}
