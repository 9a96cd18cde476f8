//! Student endpoints.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post},
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use vaxtrack_common::{AppError, AppResult};
use vaxtrack_core::{
    CreateStudentInput, RecordVaccinationInput, ResolvedVaccination, SearchStudentsInput,
    StudentRecord, UpdateStudentInput,
};
use vaxtrack_db::entities::vaccination;

use super::drives::DriveResponse;
use crate::{extractors::AdminPrincipal, middleware::AppState, response::Created};

/// Largest accepted import upload (10 MiB).
pub const MAX_IMPORT_BYTES: usize = 10 * 1024 * 1024;

// ==================== Request/Response Types ====================

/// Vaccination event response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationResponse {
    pub id: String,
    pub drive_id: String,
    pub vaccine_name: String,
    pub date: String,
}

impl From<vaccination::Model> for VaccinationResponse {
    fn from(v: vaccination::Model) -> Self {
        Self {
            id: v.id,
            drive_id: v.drive_id,
            vaccine_name: v.vaccine_name,
            date: v.administered_at.to_rfc3339(),
        }
    }
}

/// Vaccination event with its drive, `null` when the drive is gone.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVaccinationResponse {
    #[serde(flatten)]
    pub event: VaccinationResponse,
    pub drive: Option<DriveResponse>,
}

impl From<ResolvedVaccination> for ResolvedVaccinationResponse {
    fn from(r: ResolvedVaccination) -> Self {
        Self {
            event: r.event.into(),
            drive: r.drive.map(Into::into),
        }
    }
}

/// Student response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentResponse {
    pub id: String,
    pub student_id: String,
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub vaccinated: bool,
    pub vaccinations: Vec<VaccinationResponse>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<StudentRecord> for StudentResponse {
    fn from(r: StudentRecord) -> Self {
        let s = r.student;
        Self {
            id: s.id,
            student_id: s.school_id,
            name: s.name,
            class_name: s.class_name,
            vaccinated: s.vaccinated,
            vaccinations: r.vaccinations.into_iter().map(Into::into).collect(),
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Vaccinate response.
#[derive(Debug, Serialize)]
pub struct VaccinateResponse {
    pub message: &'static str,
    pub student: StudentResponse,
}

/// Import response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub message: &'static str,
    pub inserted_students: u64,
}

// ==================== Handlers ====================

/// List students.
async fn list(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<StudentResponse>>> {
    let students = state.student_service.list().await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

/// Add a student.
async fn create(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<CreateStudentInput>, AppError>,
) -> AppResult<Created<StudentResponse>> {
    let student = state.student_service.create(input).await?;
    Ok(Created(student.into()))
}

/// Show a student with its vaccinations.
async fn show(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<StudentResponse>> {
    let student = state.student_service.get(&id).await?;
    Ok(Json(student.into()))
}

/// Edit a student.
async fn update(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateStudentInput>, AppError>,
) -> AppResult<Json<StudentResponse>> {
    let student = state.student_service.update(&id, input).await?;
    Ok(Json(student.into()))
}

/// Search students by name, class, school ID or vaccinated flag.
async fn search(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    WithRejection(Query(input), _): WithRejection<Query<SearchStudentsInput>, AppError>,
) -> AppResult<Json<Vec<StudentResponse>>> {
    let students = state.student_service.search(input).await?;
    Ok(Json(students.into_iter().map(Into::into).collect()))
}

/// Import students from an uploaded CSV file (multipart field `file`).
async fn csv_import(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> AppResult<Created<ImportResponse>> {
    let mut upload = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let is_csv = field
            .file_name()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".csv"))
            || field
                .content_type()
                .is_some_and(|ct| ct.starts_with("text/csv"));
        if !is_csv {
            return Err(AppError::BadRequest("Only CSV files are allowed".to_string()));
        }

        upload = Some(field.bytes().await?);
        break;
    }

    let data = upload.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let inserted = state.student_service.bulk_import(&data).await?;
    tracing::debug!(subject = %admin.subject, inserted, bytes = data.len(), "CSV import finished");

    Ok(Created(ImportResponse {
        message: "Students imported successfully",
        inserted_students: inserted,
    }))
}

/// Record a vaccination for a student.
async fn vaccinate(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<RecordVaccinationInput>, AppError>,
) -> AppResult<Json<VaccinateResponse>> {
    let student = state.vaccination_service.record(&id, input).await?;
    Ok(Json(VaccinateResponse {
        message: "Vaccination recorded",
        student: student.into(),
    }))
}

/// List a student's vaccinations with their drives.
async fn vaccinations(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ResolvedVaccinationResponse>>> {
    let events = state.vaccination_service.list(&id).await?;
    Ok(Json(events.into_iter().map(Into::into).collect()))
}

/// Create the students router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/search", get(search))
        .route(
            "/csv-import",
            post(csv_import).layer(DefaultBodyLimit::max(MAX_IMPORT_BYTES)),
        )
        .route("/{id}", get(show).put(update))
        .route("/{id}/vaccinate", post(vaccinate))
        .route("/{id}/vaccinations", get(vaccinations))
}
