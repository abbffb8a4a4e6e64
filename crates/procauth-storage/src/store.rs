//! The storage ports that backends implement.
//!
//! Business logic depends only on these traits, never on a connection pool.

use chrono::{DateTime, Utc};

use crate::types::*;
use crate::StoreError;

// ───────────────────────────────────── Catalog ─────────────────────────────────────

/// Append-only permission catalog.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// List catalog entries matching the filter, ordered by resource then action.
    async fn list_permissions(&self, filter: &PermissionFilter)
        -> Result<Vec<Permission>, StoreError>;

    /// Get a catalog entry by ID.
    async fn get_permission(&self, permission_id: &PermissionId) -> Result<Permission, StoreError>;

    /// Get a catalog entry by its unique (resource, action) pair.
    async fn get_permission_by_resource_action(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Permission, StoreError>;

    /// Create a catalog entry. Fails with `AlreadyExists` on a duplicate (resource, action).
    async fn create_permission(
        &self,
        params: &CreatePermissionParams,
    ) -> Result<Permission, StoreError>;

    /// Create several catalog entries atomically: all are written or none.
    async fn create_permissions(
        &self,
        params: &[CreatePermissionParams],
    ) -> Result<Vec<Permission>, StoreError>;
}

// ───────────────────────────────────── Roles ───────────────────────────────────────

/// Roles and their permission links. Role-level permissions carry no process scope.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait RoleStore: Send + Sync {
    /// List all roles ordered by name.
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    /// Get role by ID.
    async fn get_role(&self, role_id: &RoleId) -> Result<Role, StoreError>;

    /// Get role by its unique name.
    async fn get_role_by_name(&self, name: &str) -> Result<Role, StoreError>;

    /// Create a role together with its initial permission links, atomically.
    async fn create_role(
        &self,
        params: &CreateRoleParams,
        permission_ids: &[PermissionId],
    ) -> Result<Role, StoreError>;

    /// Apply a partial update and return the updated role.
    async fn update_role(
        &self,
        role_id: &RoleId,
        params: &UpdateRoleParams,
    ) -> Result<Role, StoreError>;

    /// Delete a role and its permission links. Users holding it are left without a role.
    async fn delete_role(&self, role_id: &RoleId) -> Result<(), StoreError>;

    /// Link a permission to a role. Returns `false` if the link already existed.
    async fn add_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool, StoreError>;

    /// Unlink a permission from a role. Returns `false` if there was no link.
    async fn remove_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool, StoreError>;

    /// List the catalog entries linked to a role.
    async fn list_role_permissions(&self, role_id: &RoleId) -> Result<Vec<Permission>, StoreError>;

    /// Replace the full permission set of a role, atomically.
    async fn set_role_permissions(
        &self,
        role_id: &RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError>;

    /// Copy every permission link of `from` onto `to`, skipping links `to` already has.
    /// Returns the number of links added.
    async fn copy_role_permissions(&self, from: &RoleId, to: &RoleId) -> Result<u64, StoreError>;
}

// ───────────────────────────────────── Grants ──────────────────────────────────────

/// Direct, process-scoped grants.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert or refresh the grant keyed by (user, permission, process, stage) using the
    /// backend's conflict-resolution primitive. Returns the resulting row.
    async fn upsert_grant(&self, params: &UpsertGrantParams) -> Result<Grant, StoreError>;

    /// Delete every capability grant of `permission_id` to `user_id` within `process_id`,
    /// across all stages. Returns the number of rows removed.
    async fn delete_grants(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        process_id: &ProcessId,
    ) -> Result<u64, StoreError>;

    /// Count capability grants (expired or not) for (user, permission, process).
    async fn count_grants(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        process_id: &ProcessId,
    ) -> Result<u64, StoreError>;

    /// Distinct processes in which `permission_id` is granted to `user_id`.
    async fn list_grant_processes(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<Vec<ProcessId>, StoreError>;

    /// Delete every grant row for (process, user) regardless of permission or stage.
    async fn delete_grants_for_process(
        &self,
        process_id: &ProcessId,
        user_id: &UserId,
    ) -> Result<u64, StoreError>;

    /// All grant rows of a user, including expired ones.
    async fn list_grants_for_user(&self, user_id: &UserId) -> Result<Vec<Grant>, StoreError>;

    /// All grant rows scoped to a process, including expired ones.
    async fn list_grants_for_process(
        &self,
        process_id: &ProcessId,
    ) -> Result<Vec<Grant>, StoreError>;
}

/// Consistent per-user reads for resolution.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait SubjectSnapshots: Send + Sync {
    /// Read the user's role, the role's permission ids and the user's grants unexpired at
    /// `now` inside one read transaction. An unknown user yields an empty snapshot.
    async fn load_subject(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<SubjectSnapshot, StoreError>;
}

// ───────────────────────────────────── Directories ─────────────────────────────────

/// External user directory.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_exists(&self, user_id: &UserId) -> Result<bool, StoreError>;

    /// Role of the user; `NotFound` if the user does not exist.
    async fn get_user_role_id(&self, user_id: &UserId) -> Result<Option<RoleId>, StoreError>;
}

/// External process directory.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait ProcessDirectory: Send + Sync {
    async fn process_exists(
        &self,
        process_id: &ProcessId,
        include_deleted: bool,
    ) -> Result<bool, StoreError>;

    /// Get a process, soft-deleted or not.
    async fn get_process(&self, process_id: &ProcessId) -> Result<Process, StoreError>;
}

/// External stage directory.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait::async_trait]
pub trait StageDirectory: Send + Sync {
    /// Whether a live (not soft-deleted) stage exists.
    async fn stage_exists(&self, stage_id: &StageId) -> Result<bool, StoreError>;

    /// Owning process of a stage.
    async fn get_stage_process_id(&self, stage_id: &StageId) -> Result<ProcessId, StoreError>;
}
