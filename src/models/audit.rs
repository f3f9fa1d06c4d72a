use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is performing a mutation, threaded explicitly through every write.
///
/// Stamped into `created_by` / `updated_by` on the rows a mutation touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuditContext {
    pub user_id: Option<i32>,
}

impl AuditContext {
    /// Mutations performed by the system itself (CLI, migrations, repairs).
    pub fn system() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_context_has_no_user() {
        assert_eq!(AuditContext::system().user_id, None);
        assert_eq!(AuditContext::default(), AuditContext::system());
    }

    #[test]
    fn user_context_carries_id() {
        assert_eq!(AuditContext::user(42).user_id, Some(42));
    }
}
