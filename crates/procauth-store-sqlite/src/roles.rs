use procauth_storage::{
    CreateRoleParams, Permission, PermissionId, Role, RoleId, RoleStore, StoreError,
    UpdateRoleParams,
};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::catalog::PermissionRow;
use crate::{backend, from_timestamp, map_write_err, now_secs, parse_uuid, SqliteStore};

#[derive(Debug, FromRow)]
struct RoleRow {
    id: String,
    name: String,
    description: Option<String>,
    is_system_role: bool,
    is_active: bool,
    created_at: i64,
    updated_at: i64,
}

impl RoleRow {
    fn into_role(self) -> Result<Role, StoreError> {
        Ok(Role {
            id: RoleId(parse_uuid(&self.id)?),
            name: self.name,
            description: self.description,
            is_system_role: self.is_system_role,
            is_active: self.is_active,
            created_at: from_timestamp(self.created_at)?,
            updated_at: from_timestamp(self.updated_at)?,
        })
    }
}

const ROLE_COLUMNS: &str =
    "id, name, description, is_system_role, is_active, created_at, updated_at";

async fn fetch_role(
    tx: &mut Transaction<'_, Sqlite>,
    role_id: &RoleId,
) -> Result<Role, StoreError> {
    let row = sqlx::query_as::<_, RoleRow>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?"))
        .bind(role_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(backend)?;

    row.ok_or(StoreError::NotFound)?.into_role()
}

async fn insert_links(
    tx: &mut Transaction<'_, Sqlite>,
    role_id: &RoleId,
    permission_ids: &[PermissionId],
    created_at: i64,
) -> Result<(), StoreError> {
    for permission_id in permission_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO role_permissions(role_id, permission_id, created_at)
             VALUES(?, ?, ?)",
        )
        .bind(role_id.to_string())
        .bind(permission_id.to_string())
        .bind(created_at)
        .execute(&mut **tx)
        .await
        .map_err(map_write_err)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl RoleStore for SqliteStore {
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let rows =
            sqlx::query_as::<_, RoleRow>(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"))
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }

    async fn get_role(&self, role_id: &RoleId) -> Result<Role, StoreError> {
        let row = sqlx::query_as::<_, RoleRow>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?"))
            .bind(role_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.into_role()
    }

    async fn get_role_by_name(&self, name: &str) -> Result<Role, StoreError> {
        let row =
            sqlx::query_as::<_, RoleRow>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ?"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.into_role()
    }

    async fn create_role(
        &self,
        params: &CreateRoleParams,
        permission_ids: &[PermissionId],
    ) -> Result<Role, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let role_id = RoleId::new();
        let now = now_secs();

        sqlx::query(
            "INSERT INTO roles(id, name, description, is_system_role, is_active, created_at, updated_at)
             VALUES(?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(role_id.to_string())
        .bind(&params.name)
        .bind(params.description.as_deref())
        .bind(params.is_system_role)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

        insert_links(&mut tx, &role_id, permission_ids, now).await?;
        let role = fetch_role(&mut tx, &role_id).await?;

        tx.commit().await.map_err(backend)?;
        Ok(role)
    }

    async fn update_role(
        &self,
        role_id: &RoleId,
        params: &UpdateRoleParams,
    ) -> Result<Role, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let current = fetch_role(&mut tx, role_id).await?;

        sqlx::query(
            "UPDATE roles SET name = ?, description = ?, is_active = ?, updated_at = ? WHERE id = ?",
        )
        .bind(params.name.as_deref().unwrap_or(&current.name))
        .bind(
            params
                .description
                .as_deref()
                .or(current.description.as_deref()),
        )
        .bind(params.is_active.unwrap_or(current.is_active))
        .bind(now_secs())
        .bind(role_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(map_write_err)?;

        let role = fetch_role(&mut tx, role_id).await?;
        tx.commit().await.map_err(backend)?;
        Ok(role)
    }

    async fn delete_role(&self, role_id: &RoleId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(role_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn add_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO role_permissions(role_id, permission_id, created_at)
             VALUES(?, ?, ?)",
        )
        .bind(role_id.to_string())
        .bind(permission_id.to_string())
        .bind(now_secs())
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_role_permission(
        &self,
        role_id: &RoleId,
        permission_id: &PermissionId,
    ) -> Result<bool, StoreError> {
        let result =
            sqlx::query("DELETE FROM role_permissions WHERE role_id = ? AND permission_id = ?")
                .bind(role_id.to_string())
                .bind(permission_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_role_permissions(&self, role_id: &RoleId) -> Result<Vec<Permission>, StoreError> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            "SELECT p.id, p.resource, p.action, p.name, p.description, p.created_at
               FROM role_permissions rp
               JOIN permissions p ON p.id = rp.permission_id
              WHERE rp.role_id = ?
              ORDER BY p.resource, p.action",
        )
        .bind(role_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    async fn set_role_permissions(
        &self,
        role_id: &RoleId,
        permission_ids: &[PermissionId],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        fetch_role(&mut tx, role_id).await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        insert_links(&mut tx, role_id, permission_ids, now_secs()).await?;

        sqlx::query("UPDATE roles SET updated_at = ? WHERE id = ?")
            .bind(now_secs())
            .bind(role_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn copy_role_permissions(&self, from: &RoleId, to: &RoleId) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        fetch_role(&mut tx, from).await?;
        fetch_role(&mut tx, to).await?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO role_permissions(role_id, permission_id, created_at)
             SELECT ?, permission_id, ? FROM role_permissions WHERE role_id = ?",
        )
        .bind(to.to_string())
        .bind(now_secs())
        .bind(from.to_string())
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(result.rows_affected())
    }
}
