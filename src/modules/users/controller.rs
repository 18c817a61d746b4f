use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::middleware::auth::CurrentUser;
use crate::middleware::request_meta::RequestMeta;
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::users::model::{AdminUserPatch, SelfProfilePatch, User, UserDetail};
use crate::modules::users::service::UserService;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Get a single user with the count of students they created
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserDetail),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, actor))]
pub async fn get_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, AppError> {
    let user = UserService::get_user(&state.db, id, &actor).await?;
    Ok(Json(user))
}

/// Update a user
///
/// Admins may change any field. Everyone else may only rename themselves;
/// other fields in the body are ignored.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = AdminUserPatch,
    responses(
        (status = 200, description = "User updated successfully", body = User),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - not your account", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, actor, body))]
pub async fn update_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    meta: RequestMeta,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<User>, AppError> {
    if !actor.is_admin() && actor.id != id {
        return Err(AppError::forbidden("You can only update your own profile"));
    }

    // The caller's role picks the patch type, so the permitted field set is
    // fixed before any value reaches the database.
    let user = if actor.is_admin() {
        let patch: AdminUserPatch = serde_json::from_value(body)
            .map_err(|_| AppError::bad_request("Invalid request body"))?;
        patch.validate().map_err(|e| AppError::validation(&e))?;
        UserService::admin_update(&state.db, id, &actor, patch, &meta).await?
    } else {
        let patch: SelfProfilePatch = serde_json::from_value(body)
            .map_err(|_| AppError::bad_request("Invalid request body"))?;
        patch.validate().map_err(|e| AppError::validation(&e))?;
        UserService::update_profile(&state.db, id, &actor, patch, &meta).await?
    };

    Ok(Json(user))
}

/// Delete a user (admin only, never your own account)
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 400, description = "Cannot delete your own account", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden - admin only", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
#[instrument(skip(state, actor))]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<Uuid>,
    meta: RequestMeta,
) -> Result<Json<serde_json::Value>, AppError> {
    UserService::delete_user(&state.db, id, &actor, &meta).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
