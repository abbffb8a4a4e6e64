use procauth_storage::{PermissionId, ProcessId, StoreError};
use thiserror::Error;

/// Errors surfaced to callers of the authorization services.
///
/// Partial failures of bulk operations are not errors; they are reported inside the
/// operation's outcome.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A user, permission, role, process or stage does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Revoke target absent. Lists the other processes where the same permission is
    /// still granted to the user so the caller can correct the request.
    #[error(
        "permission {permission_id} is not granted in process {process_id}{}",
        other_scopes_hint(.other_processes)
    )]
    GrantNotFound {
        permission_id: PermissionId,
        process_id: ProcessId,
        other_processes: Vec<ProcessId>,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    /// Storage or transaction failure, or a violated post-condition.
    #[error("internal error: {0}")]
    Internal(String),
}

fn other_scopes_hint(other_processes: &[ProcessId]) -> String {
    if other_processes.is_empty() {
        return String::new();
    }
    let ids: Vec<String> = other_processes.iter().map(ToString::to_string).collect();
    format!("; it is granted in process(es): {}", ids.join(", "))
}

impl AuthzError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        AuthzError::NotFound(what.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AuthzError::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AuthzError::NotFound(_) | AuthzError::GrantNotFound { .. }
        )
    }

    /// Map a storage error for a lookup of `what`: `NotFound` keeps its meaning, anything
    /// else is internal.
    pub(crate) fn lookup(what: impl std::fmt::Display) -> impl FnOnce(StoreError) -> Self {
        move |e| match e {
            StoreError::NotFound => AuthzError::not_found(what),
            other => AuthzError::from(other),
        }
    }
}

impl From<StoreError> for AuthzError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => AuthzError::NotFound("record".to_string()),
            StoreError::AlreadyExists => AuthzError::Validation("record already exists".to_string()),
            StoreError::Conflict => AuthzError::Internal("storage conflict".to_string()),
            StoreError::Backend(msg) => AuthzError::Internal(msg),
        }
    }
}
