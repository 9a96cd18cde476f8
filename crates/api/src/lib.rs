//! HTTP API layer for vaxtrack.
//!
//! - **Endpoints**: drives, students, vaccination reports and the dashboard
//! - **Extractors**: admin authorization
//! - **Middleware**: bearer token resolution
//!
//! Built on Axum 0.8. Every route requires the `manage:all` capability.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
