use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::auth::CurrentUser;
use crate::middleware::request_meta::RequestMeta;
use crate::modules::audit::model::AuditAction;
use crate::modules::audit::service::AuditService;
use crate::modules::users::model::{AdminUserPatch, SelfProfilePatch, User, UserDetail};
use crate::utils::errors::AppError;
use crate::utils::password::hash_password;

pub struct UserService;

impl UserService {
    /// Fetches a user with the number of students they created. Callers may
    /// only view their own account unless they are an admin.
    #[instrument(skip(db, actor))]
    pub async fn get_user(
        db: &PgPool,
        id: Uuid,
        actor: &CurrentUser,
    ) -> Result<UserDetail, AppError> {
        if !actor.is_admin() && actor.id != id {
            return Err(AppError::forbidden("You can only view your own profile"));
        }

        let user = Self::fetch_user(db, id).await?;

        let student_count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE created_by_id = $1")
                .bind(id)
                .fetch_one(db)
                .await?;

        Ok(UserDetail {
            user,
            student_count,
        })
    }

    /// Self-service profile update: names only.
    #[instrument(skip(db, actor, patch, meta))]
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        actor: &CurrentUser,
        patch: SelfProfilePatch,
        meta: &RequestMeta,
    ) -> Result<User, AppError> {
        if actor.id != id {
            return Err(AppError::forbidden("You can only update your own profile"));
        }

        let existing = Self::fetch_user(db, id).await?;

        let first_name = patch.first_name.unwrap_or(existing.first_name);
        let last_name = patch.last_name.unwrap_or(existing.last_name);

        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET first_name = $1, last_name = $2, updated_at = NOW()
             WHERE id = $3
             RETURNING id, email, first_name, last_name, role, is_active, created_at, updated_at",
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(id)
        .fetch_one(db)
        .await?;

        AuditService::record(
            db,
            AuditAction::UpdateUser,
            Some(actor.id),
            meta,
            format!("Updated user: {}", user.email),
        )
        .await?;

        Ok(user)
    }

    /// Admin update: any field. A present password is rehashed; role and
    /// is_active apply only when present in the patch.
    #[instrument(skip(db, actor, patch, meta))]
    pub async fn admin_update(
        db: &PgPool,
        id: Uuid,
        actor: &CurrentUser,
        patch: AdminUserPatch,
        meta: &RequestMeta,
    ) -> Result<User, AppError> {
        if !actor.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }

        let existing = Self::fetch_user(db, id).await?;

        if let Some(email) = &patch.email {
            if *email != existing.email {
                let taken =
                    sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
                        .bind(email)
                        .fetch_optional(db)
                        .await?;
                if taken.is_some() {
                    return Err(AppError::conflict("Email already exists"));
                }
            }
        }

        let email = patch.email.unwrap_or(existing.email);
        let first_name = patch.first_name.unwrap_or(existing.first_name);
        let last_name = patch.last_name.unwrap_or(existing.last_name);
        let role = patch.role.unwrap_or(existing.role);
        let is_active = patch.is_active.unwrap_or(existing.is_active);

        let result = if let Some(password) = patch.password {
            let hashed_password = hash_password(&password)?;
            sqlx::query_as::<_, User>(
                "UPDATE users
                 SET email = $1, first_name = $2, last_name = $3, role = $4,
                     is_active = $5, password = $6, updated_at = NOW()
                 WHERE id = $7
                 RETURNING id, email, first_name, last_name, role, is_active,
                           created_at, updated_at",
            )
            .bind(&email)
            .bind(&first_name)
            .bind(&last_name)
            .bind(role)
            .bind(is_active)
            .bind(&hashed_password)
            .bind(id)
            .fetch_one(db)
            .await
        } else {
            sqlx::query_as::<_, User>(
                "UPDATE users
                 SET email = $1, first_name = $2, last_name = $3, role = $4,
                     is_active = $5, updated_at = NOW()
                 WHERE id = $6
                 RETURNING id, email, first_name, last_name, role, is_active,
                           created_at, updated_at",
            )
            .bind(&email)
            .bind(&first_name)
            .bind(&last_name)
            .bind(role)
            .bind(is_active)
            .bind(id)
            .fetch_one(db)
            .await
        };

        let user = result.map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::conflict("Email already exists");
                }
            }
            AppError::internal(e)
        })?;

        AuditService::record(
            db,
            AuditAction::UpdateUser,
            Some(actor.id),
            meta,
            format!("Updated user: {}", user.email),
        )
        .await?;

        Ok(user)
    }

    /// Deletes a user. Admin only, and never the caller's own account.
    /// Students the user created keep a dangling weak reference.
    #[instrument(skip(db, actor, meta))]
    pub async fn delete_user(
        db: &PgPool,
        id: Uuid,
        actor: &CurrentUser,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        if !actor.is_admin() {
            return Err(AppError::forbidden("Admin access required"));
        }

        if actor.id == id {
            return Err(AppError::bad_request("Cannot delete your own account"));
        }

        let existing = Self::fetch_user(db, id).await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        AuditService::record(
            db,
            AuditAction::DeleteUser,
            Some(actor.id),
            meta,
            format!("Deleted user: {}", existing.email),
        )
        .await?;

        Ok(())
    }

    async fn fetch_user(db: &PgPool, id: Uuid) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, first_name, last_name, role, is_active, created_at, updated_at
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
    }
}
