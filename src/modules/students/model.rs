//! Student data models and DTOs.
//!
//! # Core types
//!
//! - [`Student`] - student record as stored
//! - [`StudentDetail`] - student plus a summary of the creating user
//!
//! # Request DTOs
//!
//! - [`CreateStudentDto`] - all required fields for a new record
//! - [`UpdateStudentDto`] - partial update, every field optional
//! - [`StudentFilterParams`] - list query: search, filters, sort, pagination
//!
//! Sorting is restricted to the closed [`SortField`] enum so caller-controlled
//! strings never reach the SQL `ORDER BY` clause.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::utils::pagination::{PaginationMeta, PaginationParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender", rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "student_status", rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Graduated,
    Suspended,
    Withdrawn,
}

/// A student record.
///
/// `created_by_id` is a weak reference to the creating user; deleting that
/// user leaves it dangling (set to null), it never cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub address: Option<String>,
    pub department: String,
    pub program: String,
    pub year: i32,
    pub semester: i32,
    pub enrollment_date: NaiveDate,
    pub gpa: Option<f64>,
    pub status: StudentStatus,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of the user that created a student record.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct CreatedBySummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub student: Student,
    pub created_by: Option<CreatedBySummary>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub student_id: String,
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid email"))]
    pub email: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Gender,
    pub address: Option<String>,
    #[validate(length(min = 1, message = "department must not be empty"))]
    pub department: String,
    #[validate(length(min = 1, message = "program must not be empty"))]
    pub program: String,
    #[validate(range(min = 1, max = 5, message = "year must be between 1 and 5"))]
    pub year: i32,
    #[validate(range(min = 1, max = 2, message = "semester must be between 1 and 2"))]
    pub semester: i32,
    /// Defaults to the current date when absent.
    pub enrollment_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 4.0, message = "gpa must be between 0.0 and 4.0"))]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub status: StudentStatus,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, message = "student_id must not be empty"))]
    pub student_id: Option<String>,
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub last_name: Option<String>,
    #[validate(email(message = "email must be a valid email"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub address: Option<String>,
    #[validate(length(min = 1, message = "department must not be empty"))]
    pub department: Option<String>,
    #[validate(length(min = 1, message = "program must not be empty"))]
    pub program: Option<String>,
    #[validate(range(min = 1, max = 5, message = "year must be between 1 and 5"))]
    pub year: Option<i32>,
    #[validate(range(min = 1, max = 2, message = "semester must be between 1 and 2"))]
    pub semester: Option<i32>,
    pub enrollment_date: Option<NaiveDate>,
    #[validate(range(min = 0.0, max = 4.0, message = "gpa must be between 0.0 and 4.0"))]
    pub gpa: Option<f64>,
    pub status: Option<StudentStatus>,
}

/// Columns the list endpoint may sort by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    StudentId,
    FirstName,
    LastName,
    Email,
    Department,
    Program,
    Year,
    Semester,
    Gpa,
    Status,
    EnrollmentDate,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::StudentId => "student_id",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Email => "email",
            Self::Department => "department",
            Self::Program => "program",
            Self::Year => "year",
            Self::Semester => "semester",
            Self::Gpa => "gpa",
            Self::Status => "status",
            Self::EnrollmentDate => "enrollment_date",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// List query parameters. `search` is an OR substring match over first name,
/// last name, email, and student id; `status` and `program` are exact-match
/// filters combined with AND.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct StudentFilterParams {
    pub search: Option<String>,
    pub status: Option<StudentStatus>,
    pub program: Option<String>,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortDirection,
    #[serde(flatten)]
    pub pagination: PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}

// --- statistics ---

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCounts {
    pub active: i64,
    pub graduated: i64,
    pub suspended: i64,
    pub withdrawn: i64,
}

/// Grouped on the `program` column but labeled `department` for
/// compatibility with the consuming dashboard.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct DepartmentCount {
    pub department: String,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct YearCount {
    pub year: i32,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct RecentStudent {
    pub id: Uuid,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub program: String,
    /// Alias of `program`, kept for dashboard compatibility.
    pub department: String,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
}

/// Four-bucket GPA histogram: excellent >= 3.5, good [3.0, 3.5),
/// average [2.5, 3.0), below_average < 2.5. Students without a GPA are not
/// counted in any bucket.
#[derive(Debug, Serialize, ToSchema)]
pub struct GpaDistribution {
    pub excellent: i64,
    pub good: i64,
    pub average: i64,
    pub below_average: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentStatistics {
    pub total: i64,
    pub by_status: StatusCounts,
    pub by_department: Vec<DepartmentCount>,
    pub by_year: Vec<YearCount>,
    pub recent_students: Vec<RecentStudent>,
    /// Average over recorded GPAs, rounded to two decimals; absent when no
    /// student has one.
    pub average_gpa: Option<f64>,
    pub gpa_distribution: GpaDistribution,
}
