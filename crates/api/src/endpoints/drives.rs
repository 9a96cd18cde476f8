//! Drive endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use vaxtrack_common::{AppError, AppResult};
use vaxtrack_core::{CreateDriveInput, UpdateDriveInput};
use vaxtrack_db::entities::drive;

use crate::{extractors::AdminPrincipal, middleware::AppState, response::Created};

/// Drive response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveResponse {
    pub id: String,
    pub title: String,
    pub vaccine_name: String,
    pub date: String,
    pub location: String,
    pub available_doses: i32,
    pub applicable_classes: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<drive::Model> for DriveResponse {
    fn from(d: drive::Model) -> Self {
        Self {
            applicable_classes: d.class_labels(),
            id: d.id,
            title: d.title,
            vaccine_name: d.vaccine_name,
            date: d.date.to_rfc3339(),
            location: d.location,
            available_doses: d.available_doses,
            created_at: d.created_at.to_rfc3339(),
            updated_at: d.updated_at.map(|dt| dt.to_rfc3339()),
        }
    }
}

/// Schedule a drive.
async fn create(
    AdminPrincipal(admin): AdminPrincipal,
    State(state): State<AppState>,
    WithRejection(Json(input), _): WithRejection<Json<CreateDriveInput>, AppError>,
) -> AppResult<Created<DriveResponse>> {
    let drive = state.drive_service.create(input).await?;
    tracing::debug!(subject = %admin.subject, drive_id = %drive.id, "Drive created via API");
    Ok(Created(drive.into()))
}

/// List drives, earliest first.
async fn list(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DriveResponse>>> {
    let drives = state.drive_service.list().await?;
    Ok(Json(drives.into_iter().map(Into::into).collect()))
}

/// Show a drive.
async fn show(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DriveResponse>> {
    let drive = state.drive_service.get(&id).await?;
    Ok(Json(drive.into()))
}

/// Edit an upcoming drive.
async fn update(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    Path(id): Path<String>,
    WithRejection(Json(input), _): WithRejection<Json<UpdateDriveInput>, AppError>,
) -> AppResult<Json<DriveResponse>> {
    let drive = state.drive_service.update(&id, input).await?;
    Ok(Json(drive.into()))
}

/// Create the drives router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{id}", get(show).put(update))
}
