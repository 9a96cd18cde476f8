//! Database entities.

pub mod drive;
pub mod student;
pub mod vaccination;

pub use drive::Entity as Drive;
pub use student::Entity as Student;
pub use vaccination::Entity as Vaccination;
