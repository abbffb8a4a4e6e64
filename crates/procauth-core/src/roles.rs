use procauth_storage::{
    CreateRoleParams, Permission, PermissionId, Role, RoleId, StoreError, UpdateRoleParams,
};
use serde::{Deserialize, Serialize};

use crate::{AuthzError, Ports};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_system_role: bool,
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

/// Partial role update. `permission_ids`, when present, replaces the whole permission set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub permission_ids: Option<Vec<PermissionId>>,
}

/// Outcome of linking a permission to a role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLink {
    Linked,
    AlreadyLinked,
}

/// Role bundles and their permission links.
#[derive(Clone)]
pub struct RoleService {
    ports: Ports,
}

impl RoleService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    pub async fn list(&self) -> Result<Vec<Role>, AuthzError> {
        Ok(self.ports.roles.list_roles().await?)
    }

    pub async fn get_by_id(&self, role_id: &RoleId) -> Result<Role, AuthzError> {
        self.ports
            .roles
            .get_role(role_id)
            .await
            .map_err(AuthzError::lookup(format!("role {role_id}")))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AuthzError> {
        match self.ports.roles.get_role_by_name(name).await {
            Ok(role) => Ok(Some(role)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a role with its initial permissions. Every permission id must resolve in
    /// the catalog before anything is written.
    pub async fn create(&self, request: &CreateRoleRequest) -> Result<Role, AuthzError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AuthzError::validation("role name must not be empty"));
        }
        self.ensure_permissions_exist(&request.permission_ids).await?;

        let params = CreateRoleParams {
            name: name.to_string(),
            description: request.description.clone(),
            is_system_role: request.is_system_role,
        };
        let role = self
            .ports
            .roles
            .create_role(&params, &dedup(&request.permission_ids))
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => {
                    AuthzError::validation(format!("role name {name} is already taken"))
                }
                other => other.into(),
            })?;

        tracing::info!(
            role_id = %role.id,
            name = %role.name,
            permissions = request.permission_ids.len(),
            "role created"
        );
        Ok(role)
    }

    /// Apply a partial update. System roles keep their name and stay active.
    pub async fn update(
        &self,
        role_id: &RoleId,
        request: &UpdateRoleRequest,
    ) -> Result<Role, AuthzError> {
        let current = self.get_by_id(role_id).await?;

        let name = match &request.name {
            Some(n) if n.trim().is_empty() => {
                return Err(AuthzError::validation("role name must not be empty"));
            }
            Some(n) => Some(n.trim().to_string()),
            None => None,
        };

        if current.is_system_role {
            if name.as_deref().is_some_and(|n| n != current.name) {
                return Err(AuthzError::validation(format!(
                    "system role {} cannot be renamed",
                    current.name
                )));
            }
            if request.is_active == Some(false) {
                return Err(AuthzError::validation(format!(
                    "system role {} cannot be deactivated",
                    current.name
                )));
            }
        }

        if let Some(permission_ids) = &request.permission_ids {
            self.ensure_permissions_exist(permission_ids).await?;
        }

        let params = UpdateRoleParams {
            name,
            description: request.description.clone(),
            is_active: request.is_active,
        };
        let mut role = current;
        if !params.is_empty() {
            role = self
                .ports
                .roles
                .update_role(role_id, &params)
                .await
                .map_err(|e| match e {
                    StoreError::AlreadyExists => {
                        AuthzError::validation("role name is already taken")
                    }
                    StoreError::NotFound => AuthzError::not_found(format!("role {role_id}")),
                    other => other.into(),
                })?;
        }

        if let Some(permission_ids) = &request.permission_ids {
            self.ports
                .roles
                .set_role_permissions(role_id, &dedup(permission_ids))
                .await?;
        }

        tracing::info!(
            role_id = %role_id,
            is_active = role.is_active,
            replaced_permissions = request.permission_ids.is_some(),
            "role updated"
        );
        Ok(role)
    }

    pub async fn delete(&self, role_id: &RoleId) -> Result<(), AuthzError> {
        let role = self.get_by_id(role_id).await?;
        if role.is_system_role {
            return Err(AuthzError::validation(format!(
                "system role {} cannot be deleted",
                role.name
            )));
        }

        self.ports
            .roles
            .delete_role(role_id)
            .await
            .map_err(AuthzError::lookup(format!("role {role_id}")))?;

        tracing::info!(role_id = %role_id, name = %role.name, "role deleted");
        Ok(())
    }

    pub async fn add_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<RoleLink, AuthzError> {
        self.get_by_id(role_id).await?;
        self.ports
            .catalog
            .get_permission(permission_id)
            .await
            .map_err(AuthzError::lookup(format!("permission {permission_id}")))?;

        let inserted = self
            .ports
            .roles
            .add_role_permission(role_id, permission_id)
            .await?;

        if inserted {
            tracing::info!(
                role_id = %role_id,
                permission_id = %permission_id,
                "permission linked to role"
            );
            Ok(RoleLink::Linked)
        } else {
            Ok(RoleLink::AlreadyLinked)
        }
    }

    /// Returns `false` when the permission was not linked.
    pub async fn remove_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool, AuthzError> {
        self.get_by_id(role_id).await?;
        let removed = self
            .ports
            .roles
            .remove_role_permission(role_id, permission_id)
            .await?;

        if removed {
            tracing::info!(
                role_id = %role_id,
                permission_id = %permission_id,
                "permission unlinked from role"
            );
        }
        Ok(removed)
    }

    pub async fn get_permissions(&self, role_id: &RoleId) -> Result<Vec<Permission>, AuthzError> {
        self.get_by_id(role_id).await?;
        Ok(self.ports.roles.list_role_permissions(role_id).await?)
    }

    /// Copy all permissions of `from` onto `to`. Links `to` already has are skipped.
    pub async fn copy_permissions(&self, from: &RoleId, to: &RoleId) -> Result<u64, AuthzError> {
        if from == to {
            return Err(AuthzError::validation("cannot copy a role's permissions onto itself"));
        }
        self.get_by_id(from).await?;
        self.get_by_id(to).await?;

        let copied = self
            .ports
            .roles
            .copy_role_permissions(from, to)
            .await
            .map_err(AuthzError::lookup("role"))?;

        tracing::info!(from = %from, to = %to, copied, "role permissions copied");
        Ok(copied)
    }

    async fn ensure_permissions_exist(
        &self,
        permission_ids: &[PermissionId],
    ) -> Result<(), AuthzError> {
        let mut missing = Vec::new();
        for id in dedup(permission_ids) {
            match self.ports.catalog.get_permission(&id).await {
                Ok(_) => {}
                Err(StoreError::NotFound) => missing.push(id.to_string()),
                Err(e) => return Err(e.into()),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AuthzError::validation(format!(
                "unknown permission ids: {}",
                missing.join(", ")
            )))
        }
    }
}

/// Order-preserving dedup.
fn dedup(ids: &[PermissionId]) -> Vec<PermissionId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().filter(|id| seen.insert(*id)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let a = PermissionId::new();
        let b = PermissionId::new();
        let ids = vec![a.clone(), b.clone(), a.clone()];
        assert_eq!(dedup(&ids), vec![a, b]);
    }

    #[test]
    fn test_update_request_defaults_from_json() {
        let request: UpdateRoleRequest = serde_json::from_str(r#"{"is_active": true}"#).unwrap();
        assert_eq!(request.is_active, Some(true));
        assert!(request.permission_ids.is_none());
    }
}
