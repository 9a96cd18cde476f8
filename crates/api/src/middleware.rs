//! API middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use vaxtrack_core::{
    DashboardService, DriveService, ReportService, SharedVerifier, StudentService,
    VaccinationService,
};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub drive_service: DriveService,
    pub student_service: StudentService,
    pub vaccination_service: VaccinationService,
    pub report_service: ReportService,
    pub dashboard_service: DashboardService,
    /// Resolves bearer tokens to principals.
    pub verifier: SharedVerifier,
}

/// Authentication middleware.
///
/// Resolves the bearer token, if any, and stores the resulting principal in
/// the request extensions. Rejection is left to the extractors.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth) = req.headers().typed_get::<Authorization<Bearer>>() {
        match state.verifier.verify(auth.token()).await {
            Ok(principal) => {
                req.extensions_mut().insert(principal);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
            }
        }
    }

    next.run(req).await
}
