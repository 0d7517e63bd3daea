/// Authorization rules
///
/// Task access is a single rule table over `(requester, task, action)`:
///
/// | action | admin | creator | assignee | anyone else |
/// |--------|-------|---------|----------|-------------|
/// | read   | yes   | yes     | yes      | no          |
/// | update | yes   | yes     | no       | no          |
/// | delete | yes   | yes     | no       | no          |
///
/// User-account endpoints use [`require_admin`] and [`require_self_or_admin`].

use std::fmt;
use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("Admin role required")]
    AdminRequired,

    #[error("Not authorized to access this user")]
    NotSelf,
}

/// Operation attempted on a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Read,
    Update,
    Delete,
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskAction::Read => "read",
            TaskAction::Update => "update",
            TaskAction::Delete => "delete",
        })
    }
}

/// Whether `auth` may perform `action` on `task`
pub fn is_allowed(auth: &AuthContext, task: &Task, action: TaskAction) -> bool {
    if auth.is_admin() || task.created_by == auth.user_id {
        return true;
    }

    match action {
        TaskAction::Read => task.assigned_to == Some(auth.user_id),
        TaskAction::Update | TaskAction::Delete => false,
    }
}

pub fn require_admin(auth: &AuthContext) -> Result<(), AuthzError> {
    if auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

/// Allows a user to act on their own account; admins may act on any
pub fn require_self_or_admin(auth: &AuthContext, user_id: Uuid) -> Result<(), AuthzError> {
    if auth.is_admin() || auth.user_id == user_id {
        Ok(())
    } else {
        Err(AuthzError::NotSelf)
    }
}
