//! vaxtrack server entry point.

use std::sync::Arc;

use axum::{Router, middleware};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vaxtrack_api::{
    middleware::{AppState, auth_middleware},
    router as api_router,
};
use vaxtrack_common::Config;
use vaxtrack_core::{
    DashboardService, DriveService, ReportService, SharedVerifier, StaticTokenVerifier,
    StudentService, VaccinationService,
};
use vaxtrack_db::repositories::{DriveRepository, StudentRepository, VaccinationRepository};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vaxtrack=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting vaxtrack server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = vaxtrack_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    vaxtrack_db::migrate(&db).await?;
    info!("Migrations completed");

    let db = Arc::new(db);

    // Initialize repositories
    let student_repo = StudentRepository::new(Arc::clone(&db));
    let vaccination_repo = VaccinationRepository::new(Arc::clone(&db));
    let drive_repo = DriveRepository::new(Arc::clone(&db));

    // Initialize services
    let verifier: SharedVerifier = Arc::new(StaticTokenVerifier::from_config(&config.auth));
    let state = AppState {
        drive_service: DriveService::new(drive_repo.clone()),
        student_service: StudentService::new(student_repo.clone(), vaccination_repo.clone()),
        vaccination_service: VaccinationService::new(
            student_repo.clone(),
            vaccination_repo.clone(),
            drive_repo.clone(),
        ),
        report_service: ReportService::new(vaccination_repo),
        dashboard_service: DashboardService::new(student_repo, drive_repo),
        verifier,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
