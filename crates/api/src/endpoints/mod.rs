//! API endpoints.

mod dashboard;
mod drives;
mod students;
mod vaccinations;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/drives", drives::router())
        .nest("/students", students::router())
        .nest("/vaccinations", vaccinations::router())
        .nest("/dashboard", dashboard::router())
}
