use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::CurrentUser;
use crate::middleware::request_meta::RequestMeta;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::students::model::{
    CreateStudentDto, PaginatedStudentsResponse, StudentDetail, StudentFilterParams,
    StudentStatistics, UpdateStudentDto,
};
use crate::modules::students::service::StudentService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::pagination::PaginationMeta;
use crate::validator::ValidatedJson;

/// List students with search, filters, sorting, and pagination
#[utoipa::path(
    get,
    path = "/api/students",
    params(
        ("search" = Option<String>, Query, description = "Substring match over name, email, student id"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("program" = Option<String>, Query, description = "Filter by program (exact match)"),
        ("sort_by" = Option<String>, Query, description = "Sort column (closed set)"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
        ("page" = Option<i64>, Query, description = "Page number, 1-based"),
        ("limit" = Option<i64>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Paginated students", body = PaginatedStudentsResponse),
        (status = 400, description = "Bad query parameters", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _actor, params))]
pub async fn get_students(
    State(state): State<AppState>,
    _actor: CurrentUser,
    Query(params): Query<StudentFilterParams>,
) -> Result<Json<PaginatedStudentsResponse>, AppError> {
    let (students, total) = StudentService::list(&state.db, &params).await?;

    let response = PaginatedStudentsResponse {
        data: students,
        meta: PaginationMeta::new(
            params.pagination.page(),
            params.pagination.limit(),
            total,
        ),
    };

    Ok(Json(response))
}

/// Aggregate statistics over the students table
#[utoipa::path(
    get,
    path = "/api/students/statistics",
    responses(
        (status = 200, description = "Student statistics", body = StudentStatistics),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _actor))]
pub async fn get_statistics(
    State(state): State<AppState>,
    _actor: CurrentUser,
) -> Result<Json<StudentStatistics>, AppError> {
    let statistics = StudentService::statistics(&state.db).await?;
    Ok(Json(statistics))
}

/// Get a single student with the creating user's summary
#[utoipa::path(
    get,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student details", body = StudentDetail),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, _actor))]
pub async fn get_student(
    State(state): State<AppState>,
    _actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<StudentDetail>, AppError> {
    let student = StudentService::get_student(&state.db, id).await?;
    Ok(Json(student))
}

/// Create a student record
#[utoipa::path(
    post,
    path = "/api/students",
    request_body = CreateStudentDto,
    responses(
        (status = 201, description = "Student created successfully", body = StudentDetail),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Student ID or email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, actor, dto))]
pub async fn create_student(
    State(state): State<AppState>,
    actor: CurrentUser,
    meta: RequestMeta,
    ValidatedJson(dto): ValidatedJson<CreateStudentDto>,
) -> Result<(StatusCode, Json<StudentDetail>), AppError> {
    let student = StudentService::create_student(&state.db, dto, &actor, &meta).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// Update a student record (partial)
#[utoipa::path(
    put,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    request_body = UpdateStudentDto,
    responses(
        (status = 200, description = "Student updated successfully", body = StudentDetail),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 409, description = "Student ID or email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, actor, dto))]
pub async fn update_student(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    meta: RequestMeta,
    ValidatedJson(dto): ValidatedJson<UpdateStudentDto>,
) -> Result<Json<StudentDetail>, AppError> {
    let student = StudentService::update_student(&state.db, id, dto, &actor, &meta).await?;
    Ok(Json(student))
}

/// Delete a student record (admin only)
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student deleted successfully"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse),
        (status = 404, description = "Student not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Students"
)]
#[instrument(skip(state, actor))]
pub async fn delete_student(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    meta: RequestMeta,
) -> Result<Json<serde_json::Value>, AppError> {
    StudentService::delete_student(&state.db, id, &actor, &meta).await?;
    Ok(Json(json!({ "message": "Student deleted successfully" })))
}
