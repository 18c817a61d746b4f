use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::request_meta::RequestMeta;
use crate::modules::audit::model::AuditAction;
use crate::utils::errors::AppError;

pub struct AuditService;

impl AuditService {
    /// Appends a security log entry. Every mutating operation calls this
    /// after the write succeeds.
    #[instrument(skip(db, meta, details))]
    pub async fn record(
        db: &PgPool,
        action: AuditAction,
        user_id: Option<Uuid>,
        meta: &RequestMeta,
        details: impl Into<String>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO security_logs (action, user_id, ip_address, user_agent, details)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(action.as_str())
        .bind(user_id)
        .bind(&meta.ip_address)
        .bind(&meta.user_agent)
        .bind(details.into())
        .execute(db)
        .await?;

        Ok(())
    }
}
