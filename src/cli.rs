//! Command-line bootstrap utilities.
//!
//! Registration always produces a regular `user` account, so the first
//! administrator has to come from somewhere else: the `create-admin`
//! command handled in `main.rs`.

use anyhow::{Context, bail};
use sqlx::PgPool;
use uuid::Uuid;

use crate::modules::users::model::UserRole;
use crate::utils::password::hash_password;

pub async fn create_admin_user(
    pool: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let existing = sqlx::query_scalar::<_, Uuid>("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("Failed to check for existing user")?;

    if existing.is_some() {
        bail!("A user with email {} already exists", email);
    }

    let hashed_password =
        hash_password(password).map_err(|_| anyhow::anyhow!("Failed to hash password"))?;

    sqlx::query(
        "INSERT INTO users (email, password, first_name, last_name, role, is_active)
         VALUES ($1, $2, $3, $4, $5, TRUE)",
    )
    .bind(email)
    .bind(&hashed_password)
    .bind(first_name)
    .bind(last_name)
    .bind(UserRole::Admin)
    .execute(pool)
    .await
    .context("Failed to insert admin user")?;

    Ok(())
}
