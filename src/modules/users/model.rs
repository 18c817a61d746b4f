//! User data models and DTOs.
//!
//! The [`User`] entity never carries the password hash; read operations
//! select everything but the `password` column. Update payloads come in two
//! typed shapes so permission scope is enforced by the type system rather
//! than runtime field filtering:
//!
//! - [`SelfProfilePatch`] — what a user may change on their own account
//! - [`AdminUserPatch`] — what an admin may change on any account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::validator::validate_password_strength;

/// Coarse permission tier gating destructive and account-management
/// operations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

/// A user account. The stored password hash is intentionally absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-user response: the account plus how many students it created.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub student_count: i64,
}

/// Fields a user may update on their own profile. Anything else in the
/// request body is silently dropped during deserialization.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SelfProfilePatch {
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub last_name: Option<String>,
}

/// Fields an admin may update on any account. A present `password` is
/// rehashed; `role` and `is_active` apply only when present.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdminUserPatch {
    #[validate(email(message = "email must be a valid email"))]
    pub email: Option<String>,
    #[validate(custom(function = validate_password_strength))]
    pub password: Option<String>,
    #[validate(length(min = 1, message = "first_name must not be empty"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name must not be empty"))]
    pub last_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}
