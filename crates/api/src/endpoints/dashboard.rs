//! Dashboard endpoint.

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use vaxtrack_common::AppResult;
use vaxtrack_core::Dashboard;

use super::drives::DriveResponse;
use crate::{extractors::AdminPrincipal, middleware::AppState};

/// Dashboard response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_students: u64,
    pub vaccinated_count: u64,
    pub percent_vaccinated: u64,
    pub upcoming_drives: Vec<DriveResponse>,
    pub has_upcoming_drives: bool,
}

impl From<Dashboard> for DashboardResponse {
    fn from(d: Dashboard) -> Self {
        Self {
            total_students: d.total_students,
            vaccinated_count: d.vaccinated_count,
            percent_vaccinated: d.percent_vaccinated,
            upcoming_drives: d.upcoming_drives.into_iter().map(Into::into).collect(),
            has_upcoming_drives: d.has_upcoming_drives,
        }
    }
}

/// Headline statistics.
async fn show(
    _admin: AdminPrincipal,
    State(state): State<AppState>,
) -> AppResult<Json<DashboardResponse>> {
    let dashboard = state.dashboard_service.get().await?;
    Ok(Json(dashboard.into()))
}

/// Create the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(show))
}
