//! Core business logic for vaxtrack.

pub mod services;

pub use services::*;
