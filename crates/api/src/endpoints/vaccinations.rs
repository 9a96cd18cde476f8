//! Vaccination report endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use vaxtrack_common::{AppError, AppResult};
use vaxtrack_core::Pagination;
use vaxtrack_db::repositories::ReportRow;

use crate::{extractors::AdminPrincipal, middleware::AppState, response::ApiResponse};

/// Report query. Page and limit stay raw text so bad values fall back to
/// the defaults instead of failing the request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub vaccine_name: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Report row response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRowResponse {
    pub student_id: String,
    pub name: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub vaccinated: bool,
    pub vaccine_name: String,
    pub date: String,
    pub drive_title: Option<String>,
}

impl From<ReportRow> for ReportRowResponse {
    fn from(r: ReportRow) -> Self {
        Self {
            student_id: r.student_id,
            name: r.name,
            class_name: r.class_name,
            vaccinated: r.vaccinated,
            vaccine_name: r.vaccine_name,
            date: r.date.to_rfc3339(),
            drive_title: r.drive_title,
        }
    }
}

/// Paginated vaccination report, newest first.
async fn report(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ReportQuery>, AppError>,
) -> AppResult<ApiResponse<Vec<ReportRowResponse>>> {
    let pagination = Pagination::from_raw(query.page.as_deref(), query.limit.as_deref());
    let rows = state
        .report_service
        .vaccination_report(query.vaccine_name.as_deref(), pagination)
        .await?;

    Ok(ApiResponse::ok(rows.into_iter().map(Into::into).collect()))
}

/// Create the vaccinations router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(report))
}
