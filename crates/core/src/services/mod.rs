//! Business logic services.

pub mod auth;
pub mod dashboard;
pub mod drive;
pub mod report;
pub mod student;
pub mod vaccination;

pub use auth::{Capability, CredentialVerifier, Principal, SharedVerifier, StaticTokenVerifier};
pub use dashboard::{Dashboard, DashboardService};
pub use drive::{CreateDriveInput, DriveService, UpdateDriveInput};
pub use report::{Pagination, ReportService};
pub use student::{
    CreateStudentInput, SearchStudentsInput, StudentRecord, StudentService, UpdateStudentInput,
};
pub use vaccination::{RecordVaccinationInput, ResolvedVaccination, VaccinationService};
