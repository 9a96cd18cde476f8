//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use vaxtrack_common::AppError;
use vaxtrack_core::{Capability, Principal};

/// Caller holding the `manage:all` capability.
///
/// Rejects with 401 when no valid bearer token was presented and 403 when
/// the caller lacks the capability.
#[derive(Debug, Clone)]
pub struct AdminPrincipal(pub Principal);

impl<S> FromRequestParts<S> for AdminPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        let principal = parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| {
                AppError::Unauthorized("Missing or invalid bearer token".to_string())
            })?;

        principal.require(Capability::ManageAll)?;
        Ok(Self(principal))
    }
}
