use std::collections::HashSet;

use procauth_storage::{
    CreatePermissionParams, Permission, PermissionFilter, PermissionId, StoreError,
};

use crate::{AuthzError, Ports};

/// Read and append access to the permission catalog.
#[derive(Clone)]
pub struct CatalogService {
    ports: Ports,
}

impl CatalogService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    pub async fn list(&self, filter: &PermissionFilter) -> Result<Vec<Permission>, AuthzError> {
        Ok(self.ports.catalog.list_permissions(filter).await?)
    }

    pub async fn get_by_id(&self, permission_id: &PermissionId) -> Result<Permission, AuthzError> {
        self.ports
            .catalog
            .get_permission(permission_id)
            .await
            .map_err(AuthzError::lookup(format!("permission {permission_id}")))
    }

    pub async fn get_by_resource_action(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Permission, AuthzError> {
        self.ports
            .catalog
            .get_permission_by_resource_action(resource, action)
            .await
            .map_err(AuthzError::lookup(format!("permission {resource}:{action}")))
    }

    /// Add one catalog entry. A duplicate `(resource, action)` is a validation error.
    pub async fn create(&self, params: &CreatePermissionParams) -> Result<Permission, AuthzError> {
        validate_params(params)?;

        let permission = self
            .ports
            .catalog
            .create_permission(params)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => AuthzError::validation(format!(
                    "permission {}:{} already exists",
                    params.resource, params.action
                )),
                other => other.into(),
            })?;

        tracing::info!(
            permission_id = %permission.id,
            key = %permission.key(),
            "permission created"
        );
        Ok(permission)
    }

    /// Add several entries in one transaction. Nothing is written if any entry is invalid,
    /// repeats another entry of the batch, or already exists.
    pub async fn create_bulk(
        &self,
        params: &[CreatePermissionParams],
    ) -> Result<Vec<Permission>, AuthzError> {
        if params.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        for p in params {
            validate_params(p)?;
            if !seen.insert((p.resource.as_str(), p.action.as_str())) {
                return Err(AuthzError::validation(format!(
                    "permission {}:{} appears more than once in the batch",
                    p.resource, p.action
                )));
            }
        }

        let created = self
            .ports
            .catalog
            .create_permissions(params)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => {
                    AuthzError::validation("one or more permissions already exist")
                }
                other => other.into(),
            })?;

        tracing::info!(count = created.len(), "permissions created");
        Ok(created)
    }
}

fn validate_params(params: &CreatePermissionParams) -> Result<(), AuthzError> {
    if params.resource.trim().is_empty() {
        return Err(AuthzError::validation("permission resource must not be empty"));
    }
    if params.action.trim().is_empty() {
        return Err(AuthzError::validation("permission action must not be empty"));
    }
    if params.name.trim().is_empty() {
        return Err(AuthzError::validation("permission name must not be empty"));
    }
    Ok(())
}
