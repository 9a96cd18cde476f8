//! Vaccination reporting service.

use vaxtrack_common::AppResult;
use vaxtrack_db::repositories::{ReportRow, VaccinationRepository};

/// Page used when none (or a bad one) is requested.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when none (or a bad one) is requested.
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest page size a caller may ask for.
pub const MAX_LIMIT: u64 = 100;

/// A normalized page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Build from raw query text. Missing, non-numeric or non-positive
    /// values fall back to the defaults; `limit` is capped at [`MAX_LIMIT`].
    #[must_use]
    pub fn from_raw(page: Option<&str>, limit: Option<&str>) -> Self {
        Self {
            page: positive_or(page, DEFAULT_PAGE),
            limit: positive_or(limit, DEFAULT_LIMIT).min(MAX_LIMIT),
        }
    }

    /// Number of rows to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

/// Service for paginated vaccination reports.
#[derive(Clone)]
pub struct ReportService {
    vaccination_repo: VaccinationRepository,
}

impl ReportService {
    /// Create a new report service.
    #[must_use]
    pub const fn new(vaccination_repo: VaccinationRepository) -> Self {
        Self { vaccination_repo }
    }

    /// One row per vaccination event, newest first, optionally for a single
    /// vaccine.
    pub async fn vaccination_report(
        &self,
        vaccine_name: Option<&str>,
        pagination: Pagination,
    ) -> AppResult<Vec<ReportRow>> {
        let vaccine_name = vaccine_name.map(str::trim).filter(|v| !v.is_empty());
        self.vaccination_repo
            .report(vaccine_name, pagination.offset(), pagination.limit)
            .await
    }
}
