//! Drive scheduling service.

use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use sea_orm::Set;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::info;
use validator::Validate;
use vaxtrack_common::{AppError, AppResult, id::IdGenerator};
use vaxtrack_db::entities::drive;
use vaxtrack_db::repositories::DriveRepository;

/// Minimum number of days between creating a drive and holding it.
pub const MIN_LEAD_DAYS: i64 = 15;

/// Input for scheduling a drive.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDriveInput {
    #[validate(length(max = 256))]
    pub title: String,
    #[validate(length(max = 128))]
    pub vaccine_name: String,
    #[serde(deserialize_with = "deserialize_drive_date")]
    pub date: DateTime<Utc>,
    #[validate(length(max = 256))]
    pub location: String,
    #[validate(range(min = 0))]
    pub available_doses: i32,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub applicable_classes: Vec<String>,
}

/// Input for editing a drive. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDriveInput {
    #[validate(length(max = 256))]
    pub title: Option<String>,
    #[validate(length(max = 128))]
    pub vaccine_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_drive_date")]
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 256))]
    pub location: Option<String>,
    #[validate(range(min = 0))]
    pub available_doses: Option<i32>,
    #[validate(length(max = 64))]
    pub applicable_classes: Option<Vec<String>>,
}

/// Parse a drive date given as RFC 3339 or as a plain `YYYY-MM-DD` day.
///
/// Plain days are taken as midnight UTC. Sub-microsecond precision is
/// dropped to match what the store keeps.
#[must_use]
pub fn parse_drive_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;
    Some(parsed.trunc_subsecs(6))
}

fn deserialize_drive_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_drive_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid drive date `{raw}`")))
}

fn deserialize_optional_drive_date<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_drive_date(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid drive date `{raw}`"))),
        None => Ok(None),
    }
}

/// Reject a drive date closer than [`MIN_LEAD_DAYS`] to `now`.
pub fn check_lead_time(date: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()> {
    if date < now + Duration::days(MIN_LEAD_DAYS) {
        return Err(AppError::Validation(format!(
            "Drive must be scheduled at least {MIN_LEAD_DAYS} days in advance"
        )));
    }
    Ok(())
}

/// Trim a required text field, rejecting it if nothing is left.
pub(crate) fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Trim class labels, dropping blanks and repeats while keeping order.
fn normalize_classes(classes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(classes.len());
    for class in classes {
        let class = class.trim();
        if !class.is_empty() && !out.iter().any(|c| c == class) {
            out.push(class.to_string());
        }
    }
    out
}

/// Service for scheduling vaccination drives.
#[derive(Clone)]
pub struct DriveService {
    drive_repo: DriveRepository,
    id_gen: IdGenerator,
}

impl DriveService {
    /// Create a new drive service.
    #[must_use]
    pub const fn new(drive_repo: DriveRepository) -> Self {
        Self {
            drive_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a drive by ID.
    pub async fn get(&self, id: &str) -> AppResult<drive::Model> {
        self.drive_repo.get_by_id(id).await
    }

    /// List every drive, earliest first.
    pub async fn list(&self) -> AppResult<Vec<drive::Model>> {
        self.drive_repo.find_all().await
    }

    /// Schedule a new drive.
    pub async fn create(&self, input: CreateDriveInput) -> AppResult<drive::Model> {
        input.validate()?;

        let title = required("title", &input.title)?;
        let vaccine_name = required("vaccineName", &input.vaccine_name)?;
        let location = required("location", &input.location)?;
        let date = input.date.trunc_subsecs(6);

        let now = Utc::now();
        check_lead_time(date, now)?;

        if self
            .drive_repo
            .find_at(date, &location, None)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "A drive is already scheduled at this date and location".to_string(),
            ));
        }

        let model = drive::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            vaccine_name: Set(vaccine_name),
            date: Set(date.into()),
            location: Set(location),
            available_doses: Set(input.available_doses),
            applicable_classes: Set(json!(normalize_classes(input.applicable_classes))),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let drive = self.drive_repo.create(model).await?;
        info!(
            drive_id = %drive.id,
            date = %drive.date,
            location = %drive.location,
            "Drive scheduled"
        );
        Ok(drive)
    }

    /// Edit a drive that has not happened yet.
    pub async fn update(&self, id: &str, input: UpdateDriveInput) -> AppResult<drive::Model> {
        input.validate()?;

        let drive = self.drive_repo.get_by_id(id).await?;
        let now = Utc::now();

        if drive.date.with_timezone(&Utc) < now {
            return Err(AppError::Validation(
                "Past drives cannot be edited".to_string(),
            ));
        }

        let title = input.title.as_deref().map(|v| required("title", v)).transpose()?;
        let vaccine_name = input
            .vaccine_name
            .as_deref()
            .map(|v| required("vaccineName", v))
            .transpose()?;
        let location = input
            .location
            .as_deref()
            .map(|v| required("location", v))
            .transpose()?;
        let date = input.date.map(|d| d.trunc_subsecs(6));

        if let Some(date) = date {
            if date < now {
                return Err(AppError::Validation(
                    "Drive cannot be moved into the past".to_string(),
                ));
            }
        }

        let target_date = date.unwrap_or_else(|| drive.date.with_timezone(&Utc));
        let target_location = location.as_deref().unwrap_or(&drive.location);
        let moved =
            target_date != drive.date.with_timezone(&Utc) || target_location != drive.location;

        if moved
            && self
                .drive_repo
                .find_at(target_date, target_location, Some(&drive.id))
                .await?
                .is_some()
        {
            return Err(AppError::Conflict(
                "Another drive is already scheduled at the new date and location".to_string(),
            ));
        }

        let mut active: drive::ActiveModel = drive.into();

        if let Some(title) = title {
            active.title = Set(title);
        }
        if let Some(vaccine_name) = vaccine_name {
            active.vaccine_name = Set(vaccine_name);
        }
        if let Some(date) = date {
            active.date = Set(date.into());
        }
        if let Some(location) = location {
            active.location = Set(location);
        }
        if let Some(available_doses) = input.available_doses {
            active.available_doses = Set(available_doses);
        }
        if let Some(classes) = input.applicable_classes {
            active.applicable_classes = Set(json!(normalize_classes(classes)));
        }
        active.updated_at = Set(Some(now.into()));

        let drive = self.drive_repo.update(active).await?;
        info!(drive_id = %drive.id, moved, "Drive updated");
        Ok(drive)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_drive(id: &str, location: &str, days_ahead: i64) -> drive::Model {
        drive::Model {
            id: id.to_string(),
            title: "Spring MMR".to_string(),
            vaccine_name: "MMR".to_string(),
            date: (Utc::now() + Duration::days(days_ahead))
                .trunc_subsecs(6)
                .into(),
            location: location.to_string(),
            available_doses: 50,
            applicable_classes: json!(["5A", "5B"]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_input(days_ahead: i64, location: &str) -> CreateDriveInput {
        CreateDriveInput {
            title: "Spring MMR".to_string(),
            vaccine_name: "MMR".to_string(),
            date: Utc::now() + Duration::days(days_ahead),
            location: location.to_string(),
            available_doses: 50,
            applicable_classes: vec!["5A".to_string(), " 5B ".to_string(), "5A".to_string()],
        }
    }

    fn service(db: MockDatabase) -> DriveService {
        DriveService::new(DriveRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_parse_drive_date_formats() {
        let day = parse_drive_date("2030-05-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2030-05-01T00:00:00+00:00");

        let stamp = parse_drive_date("2030-05-01T09:30:00+02:00").unwrap();
        assert_eq!(stamp.to_rfc3339(), "2030-05-01T07:30:00+00:00");

        assert!(parse_drive_date("next tuesday").is_none());
        assert!(parse_drive_date("").is_none());
    }

    #[test]
    fn test_check_lead_time_boundary() {
        let now = Utc::now();
        assert!(check_lead_time(now + Duration::days(MIN_LEAD_DAYS), now).is_ok());
        assert!(check_lead_time(now + Duration::days(20), now).is_ok());
        assert!(matches!(
            check_lead_time(now + Duration::days(14), now),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_classes() {
        let classes = normalize_classes(vec![
            "5A".to_string(),
            " 5B ".to_string(),
            String::new(),
            "5A".to_string(),
        ]);
        assert_eq!(classes, vec!["5A", "5B"]);
    }

    #[test]
    fn test_create_input_accepts_plain_day() {
        let input: CreateDriveInput = serde_json::from_value(json!({
            "title": "Flu",
            "vaccineName": "Influenza",
            "date": "2099-01-15",
            "location": "Gym",
            "availableDoses": 10
        }))
        .unwrap();
        assert_eq!(input.date.to_rfc3339(), "2099-01-15T00:00:00+00:00");
        assert!(input.applicable_classes.is_empty());
    }

    #[test]
    fn test_create_input_rejects_bad_date() {
        let result: Result<CreateDriveInput, _> = serde_json::from_value(json!({
            "title": "Flu",
            "vaccineName": "Influenza",
            "date": "soon",
            "location": "Gym",
            "availableDoses": 10
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_create_drive_success() {
        let created = create_test_drive("d1", "Gym", 20);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<drive::Model>::new()])
                .append_query_results([[created.clone()]]),
        );

        let result = svc.create(create_input(20, "Gym")).await.unwrap();
        assert_eq!(result.id, "d1");
        assert_eq!(result.location, "Gym");
    }

    #[tokio::test]
    async fn test_create_drive_too_soon() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.create(create_input(10, "Gym")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_drive_conflict() {
        let existing = create_test_drive("a", "Gym", 20);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = svc.create(create_input(20, "Gym")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_drive_blank_location() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.create(create_input(20, "   ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_drive_negative_doses() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let mut input = create_input(20, "Gym");
        input.available_doses = -1;

        let result = svc.create(input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_past_drive_rejected() {
        let past = create_test_drive("d1", "Gym", -1);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[past]]),
        );

        let input = UpdateDriveInput {
            available_doses: Some(10),
            ..Default::default()
        };
        let result = svc.update("d1", input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_past_drive_rejected_with_no_fields() {
        let past = create_test_drive("d1", "Gym", -3);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[past]]),
        );

        let result = svc.update("d1", UpdateDriveInput::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_not_found() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<drive::Model>::new()]),
        );

        let result = svc.update("missing", UpdateDriveInput::default()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_without_move_skips_conflict_check() {
        let drive = create_test_drive("d1", "Gym", 30);
        let mut updated = drive.clone();
        updated.available_doses = 10;
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[drive]])
                .append_query_results([[updated]]),
        );

        let input = UpdateDriveInput {
            available_doses: Some(10),
            ..Default::default()
        };
        let result = svc.update("d1", input).await.unwrap();
        assert_eq!(result.available_doses, 10);
    }

    #[tokio::test]
    async fn test_update_move_conflict() {
        let drive = create_test_drive("d1", "Gym", 30);
        let other = create_test_drive("d2", "Library", 30);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[drive]])
                .append_query_results([[other]]),
        );

        let input = UpdateDriveInput {
            location: Some("Library".to_string()),
            ..Default::default()
        };
        let result = svc.update("d1", input).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_move_into_past_rejected() {
        let drive = create_test_drive("d1", "Gym", 30);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[drive]]),
        );

        let input = UpdateDriveInput {
            date: Some(Utc::now() - Duration::days(1)),
            ..Default::default()
        };
        let result = svc.update("d1", input).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
