//! Dashboard statistics service.

use chrono::Utc;
use vaxtrack_common::AppResult;
use vaxtrack_db::entities::drive;
use vaxtrack_db::repositories::{DriveRepository, StudentRepository};

/// Headline numbers for the admin dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub total_students: u64,
    pub vaccinated_count: u64,
    /// Whole-number percentage of vaccinated students.
    pub percent_vaccinated: u64,
    /// Drives on or after now, earliest first.
    pub upcoming_drives: Vec<drive::Model>,
    pub has_upcoming_drives: bool,
}

/// `round(vaccinated / total * 100)`, or 0 for an empty school.
#[must_use]
pub fn percent_vaccinated(vaccinated: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((vaccinated as f64 / total as f64) * 100.0).round() as u64
}

/// Service aggregating dashboard statistics.
#[derive(Clone)]
pub struct DashboardService {
    student_repo: StudentRepository,
    drive_repo: DriveRepository,
}

impl DashboardService {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(student_repo: StudentRepository, drive_repo: DriveRepository) -> Self {
        Self {
            student_repo,
            drive_repo,
        }
    }

    /// Compute the dashboard.
    pub async fn get(&self) -> AppResult<Dashboard> {
        let total_students = self.student_repo.count().await?;
        let vaccinated_count = self.student_repo.count_vaccinated().await?;
        let upcoming_drives = self.drive_repo.find_upcoming(Utc::now()).await?;

        Ok(Dashboard {
            total_students,
            vaccinated_count,
            percent_vaccinated: percent_vaccinated(vaccinated_count, total_students),
            has_upcoming_drives: !upcoming_drives.is_empty(),
            upcoming_drives,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use serde_json::json;
    use std::sync::Arc;

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        maplit::btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    fn create_test_drive(id: &str, days_ahead: i64) -> drive::Model {
        drive::Model {
            id: id.to_string(),
            title: "Flu".to_string(),
            vaccine_name: "Influenza".to_string(),
            date: (Utc::now() + Duration::days(days_ahead)).into(),
            location: "Gym".to_string(),
            available_doses: 30,
            applicable_classes: json!(["5A"]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service(db: MockDatabase) -> DashboardService {
        let db = Arc::new(db.into_connection());
        DashboardService::new(StudentRepository::new(Arc::clone(&db)), DriveRepository::new(db))
    }

    #[test]
    fn test_percent_vaccinated() {
        assert_eq!(percent_vaccinated(0, 0), 0);
        assert_eq!(percent_vaccinated(1, 3), 33);
        assert_eq!(percent_vaccinated(2, 3), 67);
        assert_eq!(percent_vaccinated(1, 2), 50);
        assert_eq!(percent_vaccinated(1, 8), 13);
        assert_eq!(percent_vaccinated(5, 5), 100);
    }

    #[tokio::test]
    async fn test_dashboard_with_upcoming_drives() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(4)]])
                .append_query_results([[count_row(3)]])
                .append_query_results([[create_test_drive("d1", 3), create_test_drive("d2", 9)]]),
        );

        let dashboard = svc.get().await.unwrap();
        assert_eq!(dashboard.total_students, 4);
        assert_eq!(dashboard.vaccinated_count, 3);
        assert_eq!(dashboard.percent_vaccinated, 75);
        assert_eq!(dashboard.upcoming_drives.len(), 2);
        assert!(dashboard.has_upcoming_drives);
    }

    #[tokio::test]
    async fn test_dashboard_empty_school() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count_row(0)]])
                .append_query_results([[count_row(0)]])
                .append_query_results([Vec::<drive::Model>::new()]),
        );

        let dashboard = svc.get().await.unwrap();
        assert_eq!(dashboard.percent_vaccinated, 0);
        assert!(dashboard.upcoming_drives.is_empty());
        assert!(!dashboard.has_upcoming_drives);
    }
}
