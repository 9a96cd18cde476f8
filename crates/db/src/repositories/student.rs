//! Student repository.

use std::sync::Arc;

use crate::entities::{Student, student};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    sea_query::{Expr, Func},
};
use vaxtrack_common::{AppError, AppResult};

use super::escape_like;

/// Rows per `INSERT` in [`StudentRepository::create_many`]. Keeps each
/// statement well under the Postgres limit of 65535 bind parameters.
pub const INSERT_CHUNK_ROWS: usize = 1000;

/// Filters for [`StudentRepository::search`]. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentSearch {
    /// Case-insensitive substring of the student's name.
    pub name: Option<String>,
    /// Exact class label.
    pub class_name: Option<String>,
    /// Exact school-assigned ID.
    pub school_id: Option<String>,
    /// Exact vaccinated flag.
    pub vaccinated: Option<bool>,
}

impl StudentSearch {
    fn into_condition(self) -> Condition {
        let mut condition = Condition::all();

        if let Some(name) = self.name {
            let pattern = format!("%{}%", escape_like(&name.to_lowercase()));
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((Student, student::Column::Name))))
                    .like(pattern),
            );
        }
        if let Some(class_name) = self.class_name {
            condition = condition.add(student::Column::ClassName.eq(class_name));
        }
        if let Some(school_id) = self.school_id {
            condition = condition.add(student::Column::SchoolId.eq(school_id));
        }
        if let Some(vaccinated) = self.vaccinated {
            condition = condition.add(student::Column::Vaccinated.eq(vaccinated));
        }

        condition
    }
}

/// Student repository for database operations.
#[derive(Clone)]
pub struct StudentRepository {
    db: Arc<DatabaseConnection>,
}

impl StudentRepository {
    /// Create a new student repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a student by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<student::Model>> {
        Student::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a student by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<student::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Student {id} not found")))
    }

    /// List every student in insertion order.
    pub async fn find_all(&self) -> AppResult<Vec<student::Model>> {
        Student::find()
            .order_by_asc(student::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search students by the given filters.
    pub async fn search(&self, filters: StudentSearch) -> AppResult<Vec<student::Model>> {
        Student::find()
            .filter(filters.into_condition())
            .order_by_asc(student::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all students.
    pub async fn count(&self) -> AppResult<u64> {
        Student::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count students flagged as vaccinated.
    pub async fn count_vaccinated(&self) -> AppResult<u64> {
        Student::find()
            .filter(student::Column::Vaccinated.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new student.
    pub async fn create(&self, model: student::ActiveModel) -> AppResult<student::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert many students in chunks of [`INSERT_CHUNK_ROWS`] inside one
    /// transaction.
    ///
    /// Either every row is stored or none of them.
    pub async fn create_many(&self, models: &[student::Model]) -> AppResult<u64> {
        if models.is_empty() {
            return Ok(0);
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let mut inserted = 0;
        for chunk in models.chunks(INSERT_CHUNK_ROWS) {
            let active_models = chunk.iter().map(|m| student::ActiveModel {
                id: Set(m.id.clone()),
                school_id: Set(m.school_id.clone()),
                name: Set(m.name.clone()),
                class_name: Set(m.class_name.clone()),
                vaccinated: Set(m.vaccinated),
                created_at: Set(m.created_at),
                updated_at: Set(m.updated_at),
            });

            inserted += Student::insert_many(active_models)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted)
    }

    /// Update a student.
    pub async fn update(&self, model: student::ActiveModel) -> AppResult<student::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Set the vaccinated flag using `conn`, which may be an open
    /// transaction. A no-op when the flag is already set.
    pub async fn mark_vaccinated_on<C>(
        conn: &C,
        student: student::Model,
    ) -> AppResult<student::Model>
    where
        C: ConnectionTrait,
    {
        if student.vaccinated {
            return Ok(student);
        }

        let mut active: student::ActiveModel = student.into();
        active.vaccinated = Set(true);
        active.updated_at = Set(Some(Utc::now().into()));
        active
            .update(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, QueryTrait};

    fn create_test_student(id: &str, name: &str, vaccinated: bool) -> student::Model {
        student::Model {
            id: id.to_string(),
            school_id: format!("S-{id}"),
            name: name.to_string(),
            class_name: "5A".to_string(),
            vaccinated,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_search_condition_lowercases_name() {
        let filters = StudentSearch {
            name: Some("ANN".to_string()),
            ..Default::default()
        };
        let sql = Student::find()
            .filter(filters.into_condition())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#"LOWER("student"."name") LIKE '%ann%'"#));
    }

    #[test]
    fn test_search_condition_exact_filters() {
        let filters = StudentSearch {
            class_name: Some("5A".to_string()),
            school_id: Some("S1".to_string()),
            vaccinated: Some(true),
            ..Default::default()
        };
        let sql = Student::find()
            .filter(filters.into_condition())
            .build(DatabaseBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""student"."class_name" = '5A'"#));
        assert!(sql.contains(r#""student"."school_id" = 'S1'"#));
        assert!(sql.contains(r#""student"."vaccinated" = TRUE"#));
    }

    #[tokio::test]
    async fn test_search_returns_matches() {
        let students = vec![
            create_test_student("s1", "Ann Lee", false),
            create_test_student("s2", "joanna", true),
        ];
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([students])
                .into_connection(),
        );

        let repo = StudentRepository::new(db);
        let result = repo
            .search(StudentSearch {
                name: Some("ann".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_count_vaccinated() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(7))
                }]])
                .into_connection(),
        );

        let repo = StudentRepository::new(db);
        assert_eq!(repo.count_vaccinated().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_create_many_empty_skips_insert() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = StudentRepository::new(db);
        assert_eq!(repo.create_many(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_many_single_chunk() {
        let students = vec![
            create_test_student("s1", "Amy", true),
            create_test_student("s2", "Ben", false),
        ];
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = StudentRepository::new(Arc::clone(&db));
        assert_eq!(repo.create_many(&students).await.unwrap(), 2);

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements = log[0].statements();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].sql, "BEGIN");
        assert!(statements[1].sql.starts_with(r#"INSERT INTO "student""#));
        assert_eq!(statements[2].sql, "COMMIT");
    }

    #[tokio::test]
    async fn test_create_many_splits_large_batches() {
        let students: Vec<_> = (0..=INSERT_CHUNK_ROWS)
            .map(|i| create_test_student(&format!("s{i}"), "Kid", false))
            .collect();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: INSERT_CHUNK_ROWS as u64,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = StudentRepository::new(Arc::clone(&db));
        assert_eq!(
            repo.create_many(&students).await.unwrap(),
            INSERT_CHUNK_ROWS as u64 + 1
        );

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let inserts = log[0]
            .statements()
            .iter()
            .filter(|s| s.sql.starts_with("INSERT"))
            .count();
        assert_eq!(inserts, 2);
        assert_eq!(log[0].statements().last().unwrap().sql, "COMMIT");
    }

    #[tokio::test]
    async fn test_create_many_failed_chunk_rolls_back() {
        let students: Vec<_> = (0..=INSERT_CHUNK_ROWS)
            .map(|i| create_test_student(&format!("s{i}"), "Kid", false))
            .collect();
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: INSERT_CHUNK_ROWS as u64,
                }])
                .append_exec_errors([sea_orm::DbErr::Custom("value too long".to_string())])
                .into_connection(),
        );

        let repo = StudentRepository::new(Arc::clone(&db));
        let result = repo.create_many(&students).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        drop(repo);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 1);
        let statements = log[0].statements();
        assert_eq!(statements.first().unwrap().sql, "BEGIN");
        assert_eq!(statements.last().unwrap().sql, "ROLLBACK");
    }

    #[tokio::test]
    async fn test_mark_vaccinated_already_set_skips_update() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let student = create_test_student("s1", "Amy", true);
        let result = StudentRepository::mark_vaccinated_on(&db, student.clone())
            .await
            .unwrap();
        assert_eq!(result, student);
        assert!(db.into_transaction_log().is_empty());
    }
}
