use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::{LoginRequest, LoginResponse, RegisterRequest};
use crate::modules::students::model::{
    CreateStudentDto, CreatedBySummary, DepartmentCount, Gender, GpaDistribution,
    PaginatedStudentsResponse, RecentStudent, Student, StudentDetail, StudentStatistics,
    StudentStatus, StatusCounts, UpdateStudentDto, YearCount,
};
use crate::modules::users::model::{AdminUserPatch, SelfProfilePatch, User, UserDetail, UserRole};
use crate::utils::pagination::{PaginationMeta, PaginationParams};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register,
        crate::modules::auth::controller::login,
        crate::modules::users::controller::get_user,
        crate::modules::users::controller::update_user,
        crate::modules::users::controller::delete_user,
        crate::modules::students::controller::get_students,
        crate::modules::students::controller::get_statistics,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
    ),
    components(
        schemas(
            User,
            UserRole,
            UserDetail,
            SelfProfilePatch,
            AdminUserPatch,
            LoginRequest,
            LoginResponse,
            RegisterRequest,
            ErrorResponse,
            Student,
            StudentDetail,
            CreatedBySummary,
            Gender,
            StudentStatus,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            PaginationMeta,
            PaginationParams,
            StudentStatistics,
            StatusCounts,
            DepartmentCount,
            YearCount,
            RecentStudent,
            GpaDistribution,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "Users", description = "User account management"),
        (name = "Students", description = "Student records and statistics")
    ),
    info(
        title = "Rollbook API",
        version = "0.1.0",
        description = "Student records management REST API built with Rust, Axum, and PostgreSQL.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
