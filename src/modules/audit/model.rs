use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Action tags recorded in the security log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegistered,
    UpdateUser,
    DeleteUser,
    CreateStudent,
    UpdateStudent,
    DeleteStudent,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserRegistered => "USER_REGISTERED",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeleteUser => "DELETE_USER",
            Self::CreateStudent => "CREATE_STUDENT",
            Self::UpdateStudent => "UPDATE_STUDENT",
            Self::DeleteStudent => "DELETE_STUDENT",
        }
    }
}

/// An append-only audit entry. The application only ever inserts these;
/// they are read by operators, not by any endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SecurityLog {
    pub id: Uuid,
    pub action: String,
    pub user_id: Option<Uuid>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_tags() {
        assert_eq!(AuditAction::UserRegistered.as_str(), "USER_REGISTERED");
        assert_eq!(AuditAction::CreateStudent.as_str(), "CREATE_STUDENT");
        assert_eq!(AuditAction::DeleteUser.as_str(), "DELETE_USER");
    }
}
