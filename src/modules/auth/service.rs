use serde_json::json;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::config::jwt::JwtConfig;
use crate::middleware::request_meta::RequestMeta;
use crate::modules::audit::model::AuditAction;
use crate::modules::audit::service::AuditService;
use crate::modules::users::model::{User, UserRole};
use crate::utils::errors::AppError;
use crate::utils::jwt::create_access_token;
use crate::utils::password::{hash_password, verify_password};

use super::model::{LoginRequest, LoginResponse, RegisterRequest};

pub struct AuthService;

impl AuthService {
    /// Registers a new account. The role is always `user` and the account
    /// starts active; admins are made by other admins or the CLI.
    #[instrument(skip(db, dto, meta))]
    pub async fn register(
        db: &PgPool,
        dto: RegisterRequest,
        meta: &RequestMeta,
    ) -> Result<User, AppError> {
        let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
            .bind(&dto.email)
            .fetch_optional(db)
            .await?;

        if existing.is_some() {
            return Err(AppError::conflict("User with this email already exists"));
        }

        let hashed_password = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password, first_name, last_name, role, is_active)
             VALUES ($1, $2, $3, $4, $5, TRUE)
             RETURNING id, email, first_name, last_name, role, is_active, created_at, updated_at",
        )
        .bind(&dto.email)
        .bind(&hashed_password)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(UserRole::User)
        .fetch_one(db)
        .await
        .map_err(|e| {
            // the pre-check races with concurrent registrations; the unique
            // constraint is the authoritative guard
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::conflict("User with this email already exists");
                }
            }
            AppError::internal(e)
        })?;

        AuditService::record(
            db,
            AuditAction::UserRegistered,
            Some(user.id),
            meta,
            json!({ "email": user.email }).to_string(),
        )
        .await?;

        Ok(user)
    }

    #[instrument(skip(db, dto, jwt_config))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        #[derive(sqlx::FromRow)]
        struct UserWithPassword {
            id: Uuid,
            email: String,
            password: String,
            first_name: String,
            last_name: String,
            role: UserRole,
            is_active: bool,
            created_at: chrono::DateTime<chrono::Utc>,
            updated_at: chrono::DateTime<chrono::Utc>,
        }

        let row = sqlx::query_as::<_, UserWithPassword>(
            "SELECT id, email, password, first_name, last_name, role, is_active,
                    created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(&dto.email)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

        if !verify_password(&dto.password, &row.password)? {
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !row.is_active {
            return Err(AppError::unauthorized("Account is deactivated"));
        }

        let user = User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        };

        let access_token = create_access_token(&user, jwt_config)?;

        Ok(LoginResponse { access_token, user })
    }
}
