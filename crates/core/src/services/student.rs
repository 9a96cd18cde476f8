//! Student directory service.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::Set;
use serde::Deserialize;
use tracing::{error, info};
use validator::Validate;
use vaxtrack_common::{AppError, AppResult, ImportStep, id::IdGenerator};
use vaxtrack_db::entities::{student, vaccination};
use vaxtrack_db::repositories::{StudentRepository, StudentSearch, VaccinationRepository};

use super::drive::required;

/// A student together with its vaccination events, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub student: student::Model,
    pub vaccinations: Vec<vaccination::Model>,
}

impl StudentRecord {
    /// Whether an event for this drive and vaccine is already on record.
    #[must_use]
    pub fn has_event(&self, drive_id: &str, vaccine_name: &str) -> bool {
        self.vaccinations
            .iter()
            .any(|v| v.drive_id == drive_id && v.vaccine_name == vaccine_name)
    }
}

/// Input for creating a student.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentInput {
    #[validate(length(max = 256))]
    pub name: String,
    #[serde(rename = "class")]
    #[validate(length(max = 64))]
    pub class_name: String,
    /// School-assigned identifier.
    #[validate(length(max = 64))]
    pub student_id: String,
    #[serde(default)]
    pub vaccinated: bool,
}

/// Input for editing a student. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudentInput {
    #[validate(length(max = 256))]
    pub name: Option<String>,
    #[serde(rename = "class")]
    #[validate(length(max = 64))]
    pub class_name: Option<String>,
    #[validate(length(max = 64))]
    pub student_id: Option<String>,
    pub vaccinated: Option<bool>,
}

/// Raw search parameters as they arrive in a query string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStudentsInput {
    pub name: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub student_id: Option<String>,
    pub vaccinated: Option<String>,
}

impl From<SearchStudentsInput> for StudentSearch {
    fn from(input: SearchStudentsInput) -> Self {
        Self {
            name: non_blank(input.name),
            class_name: non_blank(input.class_name),
            school_id: non_blank(input.student_id),
            vaccinated: input.vaccinated.as_deref().map(parse_flag),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a boolean cell: true iff it says `true`, ignoring case.
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

const MAX_NAME_LEN: usize = 256;
const MAX_CLASS_LEN: usize = 64;
const MAX_STUDENT_ID_LEN: usize = 64;

/// One row of an import file.
#[derive(Debug, Deserialize)]
struct ImportRow {
    name: String,
    class: String,
    #[serde(rename = "studentId")]
    student_id: String,
    #[serde(default)]
    vaccinated: String,
}

/// A parsed import row, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedStudent {
    pub name: String,
    pub class_name: String,
    pub school_id: String,
    pub vaccinated: bool,
}

fn parse_error(line: u64, message: impl std::fmt::Display) -> AppError {
    AppError::Import {
        step: ImportStep::Parse,
        message: format!("row {line}: {message}"),
    }
}

fn csv_error(err: &csv::Error) -> AppError {
    parse_error(err.position().map_or(0, csv::Position::line), err)
}

/// Parse an import file with a `name,class,studentId,vaccinated` header.
///
/// Cells are trimmed and blank lines skipped. Row numbers in errors count
/// the header as row 1.
pub fn parse_import(data: &[u8]) -> AppResult<Vec<ImportedStudent>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);
    let headers = reader.headers().map_err(|e| csv_error(&e))?.clone();

    let mut students = Vec::new();
    let mut record = csv::StringRecord::new();
    while reader.read_record(&mut record).map_err(|e| csv_error(&e))? {
        let line = record.position().map_or(0, csv::Position::line);
        let row: ImportRow = record
            .deserialize(Some(&headers))
            .map_err(|e| parse_error(line, e))?;

        let field = |name: &str, value: &str, max: usize| {
            let value = value.trim();
            if value.is_empty() {
                Err(parse_error(line, format!("{name} is required")))
            } else if value.chars().count() > max {
                Err(parse_error(
                    line,
                    format!("{name} must be at most {max} characters"),
                ))
            } else {
                Ok(value.to_string())
            }
        };

        students.push(ImportedStudent {
            name: field("name", &row.name, MAX_NAME_LEN)?,
            class_name: field("class", &row.class, MAX_CLASS_LEN)?,
            school_id: field("studentId", &row.student_id, MAX_STUDENT_ID_LEN)?,
            vaccinated: parse_flag(&row.vaccinated),
        });
    }

    Ok(students)
}

/// Service for the student directory.
#[derive(Clone)]
pub struct StudentService {
    student_repo: StudentRepository,
    vaccination_repo: VaccinationRepository,
    id_gen: IdGenerator,
}

impl StudentService {
    /// Create a new student service.
    #[must_use]
    pub const fn new(
        student_repo: StudentRepository,
        vaccination_repo: VaccinationRepository,
    ) -> Self {
        Self {
            student_repo,
            vaccination_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get a student with its vaccination events.
    pub async fn get(&self, id: &str) -> AppResult<StudentRecord> {
        let student = self.student_repo.get_by_id(id).await?;
        let vaccinations = self.vaccination_repo.find_by_student(&student.id).await?;
        Ok(StudentRecord {
            student,
            vaccinations,
        })
    }

    /// List every student.
    pub async fn list(&self) -> AppResult<Vec<StudentRecord>> {
        let students = self.student_repo.find_all().await?;
        self.attach_vaccinations(students).await
    }

    /// Find students matching every supplied filter.
    pub async fn search(&self, input: SearchStudentsInput) -> AppResult<Vec<StudentRecord>> {
        let students = self.student_repo.search(input.into()).await?;
        self.attach_vaccinations(students).await
    }

    /// Add a student.
    pub async fn create(&self, input: CreateStudentInput) -> AppResult<StudentRecord> {
        input.validate()?;

        let model = student::ActiveModel {
            id: Set(self.id_gen.generate()),
            school_id: Set(required("studentId", &input.student_id)?),
            name: Set(required("name", &input.name)?),
            class_name: Set(required("class", &input.class_name)?),
            vaccinated: Set(input.vaccinated),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let student = self.student_repo.create(model).await?;
        info!(student_id = %student.id, school_id = %student.school_id, "Student created");
        Ok(StudentRecord {
            student,
            vaccinations: Vec::new(),
        })
    }

    /// Edit a student.
    ///
    /// The vaccinated flag can be raised but never cleared once set.
    pub async fn update(&self, id: &str, input: UpdateStudentInput) -> AppResult<StudentRecord> {
        input.validate()?;

        let student = self.student_repo.get_by_id(id).await?;

        if student.vaccinated && input.vaccinated == Some(false) {
            return Err(AppError::Validation(
                "A vaccinated student cannot be marked unvaccinated".to_string(),
            ));
        }

        let mut active: student::ActiveModel = student.into();

        if let Some(name) = input.name {
            active.name = Set(required("name", &name)?);
        }
        if let Some(class_name) = input.class_name {
            active.class_name = Set(required("class", &class_name)?);
        }
        if let Some(school_id) = input.student_id {
            active.school_id = Set(required("studentId", &school_id)?);
        }
        if let Some(vaccinated) = input.vaccinated {
            active.vaccinated = Set(vaccinated);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let student = self.student_repo.update(active).await?;
        let vaccinations = self.vaccination_repo.find_by_student(&student.id).await?;
        info!(student_id = %student.id, "Student updated");

        Ok(StudentRecord {
            student,
            vaccinations,
        })
    }

    /// Import students from delimited text, all rows or none.
    ///
    /// Returns the number of students stored.
    pub async fn bulk_import(&self, data: &[u8]) -> AppResult<u64> {
        let rows = parse_import(data)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let models: Vec<student::Model> = rows
            .into_iter()
            .map(|row| student::Model {
                id: self.id_gen.generate(),
                school_id: row.school_id,
                name: row.name,
                class_name: row.class_name,
                vaccinated: row.vaccinated,
                created_at: now.into(),
                updated_at: None,
            })
            .collect();

        let inserted = self
            .student_repo
            .create_many(&models)
            .await
            .map_err(|e| {
                error!(error = %e, rows = models.len(), "Student import insert failed");
                AppError::Import {
                    step: ImportStep::Insert,
                    message: format!("could not store {} students", models.len()),
                }
            })?;

        info!(inserted, "Students imported");
        Ok(inserted)
    }

    async fn attach_vaccinations(
        &self,
        students: Vec<student::Model>,
    ) -> AppResult<Vec<StudentRecord>> {
        let ids: Vec<String> = students.iter().map(|s| s.id.clone()).collect();
        let mut by_student: HashMap<String, Vec<vaccination::Model>> = HashMap::new();
        for event in self.vaccination_repo.find_by_students(&ids).await? {
            by_student
                .entry(event.student_id.clone())
                .or_default()
                .push(event);
        }

        Ok(students
            .into_iter()
            .map(|student| {
                let vaccinations = by_student.remove(&student.id).unwrap_or_default();
                StudentRecord {
                    student,
                    vaccinations,
                }
            })
            .collect())
    }
}
