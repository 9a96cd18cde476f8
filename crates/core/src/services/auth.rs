//! Access gate.
//!
//! Bearer tokens are resolved to a [`Principal`] by a pluggable
//! [`CredentialVerifier`]. Every administrative endpoint requires the
//! [`Capability::ManageAll`] capability.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use vaxtrack_common::config::AuthConfig;
use vaxtrack_common::{AppError, AppResult};

/// Something a principal is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Full read/write access to students, drives and reports.
    ManageAll,
}

impl Capability {
    /// Wire name of the capability.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageAll => "manage:all",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Who the caller is.
    pub subject: String,
    /// What the caller may do.
    pub capabilities: BTreeSet<Capability>,
}

impl Principal {
    /// A principal holding every administrative capability.
    #[must_use]
    pub fn admin(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            capabilities: BTreeSet::from([Capability::ManageAll]),
        }
    }

    /// Whether the principal holds `capability`.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Fail with `Forbidden` unless the principal holds `capability`.
    pub fn require(&self, capability: Capability) -> AppResult<()> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "{} lacks capability {capability}",
                self.subject
            )))
        }
    }
}

/// Resolves bearer tokens to principals.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify `token`, failing with `Unauthorized` if it is not recognised.
    async fn verify(&self, token: &str) -> AppResult<Principal>;
}

/// Shared handle to a credential verifier.
pub type SharedVerifier = Arc<dyn CredentialVerifier>;

/// Verifier accepting exactly one configured admin token.
#[derive(Clone)]
pub struct StaticTokenVerifier {
    token: String,
    subject: String,
}

impl StaticTokenVerifier {
    /// Create a verifier for `token`, granting admin rights to `subject`.
    #[must_use]
    pub fn new(token: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            subject: subject.into(),
        }
    }

    /// Create a verifier from the `auth` configuration section.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.admin_token.trim(), config.admin_subject.clone())
    }
}

impl std::fmt::Debug for StaticTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenVerifier")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> AppResult<Principal> {
        if token.is_empty() {
            return Err(AppError::Unauthorized("No token provided".to_string()));
        }
        if !constant_time_eq(token.as_bytes(), self.token.as_bytes()) {
            return Err(AppError::Unauthorized(
                "Invalid or expired token".to_string(),
            ));
        }
        Ok(Principal::admin(self.subject.clone()))
    }
}

/// Byte comparison whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
