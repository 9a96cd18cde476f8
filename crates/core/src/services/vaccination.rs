//! Vaccination recording service.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;
use vaxtrack_common::{AppError, AppResult, id::IdGenerator};
use vaxtrack_db::entities::{drive, student, vaccination};
use vaxtrack_db::repositories::{DriveRepository, StudentRepository, VaccinationRepository};

use super::drive::required;
use super::student::StudentRecord;

/// Input for recording a dose.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordVaccinationInput {
    #[validate(length(max = 32))]
    pub drive_id: String,
    #[validate(length(max = 128))]
    pub vaccine_name: String,
}

/// A vaccination event with its drive resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVaccination {
    pub event: vaccination::Model,
    /// `None` when the drive no longer exists.
    pub drive: Option<drive::Model>,
}

/// Service for recording and listing vaccinations.
#[derive(Clone)]
pub struct VaccinationService {
    student_repo: StudentRepository,
    vaccination_repo: VaccinationRepository,
    drive_repo: DriveRepository,
    id_gen: IdGenerator,
}

impl VaccinationService {
    /// Create a new vaccination service.
    #[must_use]
    pub const fn new(
        student_repo: StudentRepository,
        vaccination_repo: VaccinationRepository,
        drive_repo: DriveRepository,
    ) -> Self {
        Self {
            student_repo,
            vaccination_repo,
            drive_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Record that a student received `vaccine_name` under `drive_id`.
    ///
    /// The student's vaccinated flag is set and never cleared. Recording the
    /// same drive and vaccine twice fails with `Duplicate`.
    pub async fn record(
        &self,
        student_id: &str,
        input: RecordVaccinationInput,
    ) -> AppResult<StudentRecord> {
        input.validate()?;
        let drive_id = required("driveId", &input.drive_id)?;
        let vaccine_name = required("vaccineName", &input.vaccine_name)?;

        let student = self.student_repo.get_by_id(student_id).await?;

        if self
            .vaccination_repo
            .find_event(&student.id, &drive_id, &vaccine_name)
            .await?
            .is_some()
        {
            return Err(AppError::Duplicate(
                "Student already vaccinated for this vaccine in this drive".to_string(),
            ));
        }

        let model = vaccination::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(student.id.clone()),
            drive_id: Set(drive_id),
            vaccine_name: Set(vaccine_name),
            administered_at: Set(Utc::now().into()),
        };
        let (event, student) = self.vaccination_repo.record(model, student).await?;
        let vaccinations = self.vaccination_repo.find_by_student(&student.id).await?;

        info!(
            student_id = %student.id,
            drive_id = %event.drive_id,
            vaccine = %event.vaccine_name,
            "Vaccination recorded"
        );

        Ok(StudentRecord {
            student,
            vaccinations,
        })
    }

    /// List a student's events with their drives, oldest first.
    pub async fn list(&self, student_id: &str) -> AppResult<Vec<ResolvedVaccination>> {
        let student = self.student_repo.get_by_id(student_id).await?;
        let events = self.vaccination_repo.find_by_student(&student.id).await?;

        let mut drive_ids: Vec<String> = events.iter().map(|e| e.drive_id.clone()).collect();
        drive_ids.sort();
        drive_ids.dedup();

        let drives: HashMap<String, drive::Model> = self
            .drive_repo
            .find_by_ids(&drive_ids)
            .await?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect();

        Ok(events
            .into_iter()
            .map(|event| {
                let drive = drives.get(&event.drive_id).cloned();
                ResolvedVaccination { event, drive }
            })
            .collect())
    }
}
