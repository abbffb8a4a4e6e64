use procauth_storage::{
    CatalogStore, CreatePermissionParams, Permission, PermissionFilter, PermissionId, StoreError,
};
use sqlx::FromRow;

use crate::{backend, from_timestamp, map_write_err, now_secs, parse_uuid, SqliteStore};

#[derive(Debug, FromRow)]
pub(crate) struct PermissionRow {
    id: String,
    resource: String,
    action: String,
    name: String,
    description: Option<String>,
    created_at: i64,
}

impl PermissionRow {
    pub(crate) fn into_permission(self) -> Result<Permission, StoreError> {
        Ok(Permission {
            id: PermissionId(parse_uuid(&self.id)?),
            resource: self.resource,
            action: self.action,
            name: self.name,
            description: self.description,
            created_at: from_timestamp(self.created_at)?,
        })
    }
}

pub(crate) const PERMISSION_COLUMNS: &str = "id, resource, action, name, description, created_at";

fn new_permission(params: &CreatePermissionParams, created_at: i64) -> Result<Permission, StoreError> {
    Ok(Permission {
        id: PermissionId::new(),
        resource: params.resource.clone(),
        action: params.action.clone(),
        name: params.name.clone(),
        description: params.description.clone(),
        created_at: from_timestamp(created_at)?,
    })
}

const INSERT_PERMISSION: &str =
    "INSERT INTO permissions(id, resource, action, name, description, created_at)
     VALUES(?, ?, ?, ?, ?, ?)";

#[async_trait::async_trait]
impl CatalogStore for SqliteStore {
    async fn list_permissions(
        &self,
        filter: &PermissionFilter,
    ) -> Result<Vec<Permission>, StoreError> {
        let rows = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS}
               FROM permissions
              WHERE (? IS NULL OR resource = ?)
                AND (? IS NULL OR action = ?)
              ORDER BY resource, action"
        ))
        .bind(filter.resource.as_deref())
        .bind(filter.resource.as_deref())
        .bind(filter.action.as_deref())
        .bind(filter.action.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let permission = row.into_permission()?;
            // Free-text search is applied here rather than in SQL.
            if filter.matches(&permission) {
                out.push(permission);
            }
        }
        Ok(out)
    }

    async fn get_permission(&self, permission_id: &PermissionId) -> Result<Permission, StoreError> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = ?"
        ))
        .bind(permission_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.into_permission()
    }

    async fn get_permission_by_resource_action(
        &self,
        resource: &str,
        action: &str,
    ) -> Result<Permission, StoreError> {
        let row = sqlx::query_as::<_, PermissionRow>(&format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE resource = ? AND action = ?"
        ))
        .bind(resource)
        .bind(action)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.into_permission()
    }

    async fn create_permission(
        &self,
        params: &CreatePermissionParams,
    ) -> Result<Permission, StoreError> {
        let permission = new_permission(params, now_secs())?;

        sqlx::query(INSERT_PERMISSION)
            .bind(permission.id.to_string())
            .bind(&permission.resource)
            .bind(&permission.action)
            .bind(&permission.name)
            .bind(permission.description.as_deref())
            .bind(permission.created_at.timestamp())
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        Ok(permission)
    }

    async fn create_permissions(
        &self,
        params: &[CreatePermissionParams],
    ) -> Result<Vec<Permission>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let created_at = now_secs();

        let mut out = Vec::with_capacity(params.len());
        for p in params {
            let permission = new_permission(p, created_at)?;
            sqlx::query(INSERT_PERMISSION)
                .bind(permission.id.to_string())
                .bind(&permission.resource)
                .bind(&permission.action)
                .bind(&permission.name)
                .bind(permission.description.as_deref())
                .bind(created_at)
                .execute(&mut *tx)
                .await
                .map_err(map_write_err)?;
            out.push(permission);
        }

        tx.commit().await.map_err(backend)?;
        Ok(out)
    }
}
