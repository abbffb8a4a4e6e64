use chrono::{DateTime, Utc};
use procauth_storage::{
    Grant, GrantId, GrantKind, GrantStore, PermissionId, ProcessId, RoleId, StageId, StoreError,
    SubjectSnapshot, SubjectSnapshots, UpsertGrantParams, UserId,
};
use sqlx::FromRow;

use crate::{
    backend, from_optional_timestamp, from_timestamp, map_write_err, now_secs, parse_optional_uuid,
    parse_uuid, SqliteStore,
};

#[derive(Debug, FromRow)]
struct GrantRow {
    id: String,
    user_id: String,
    permission_id: String,
    process_id: String,
    stage_id: String,
    granted_by: String,
    granted_at: i64,
    expires_at: Option<i64>,
}

impl GrantRow {
    fn into_grant(self) -> Result<Grant, StoreError> {
        let permission_id = parse_optional_uuid(&self.permission_id)?.map(PermissionId);
        let stage_id = parse_optional_uuid(&self.stage_id)?.map(StageId);
        let kind = GrantKind::from_parts(permission_id, stage_id).ok_or_else(|| {
            StoreError::Backend(format!("grant {} has neither permission nor stage", self.id))
        })?;

        Ok(Grant {
            id: GrantId(parse_uuid(&self.id)?),
            user_id: UserId(parse_uuid(&self.user_id)?),
            process_id: ProcessId(parse_uuid(&self.process_id)?),
            kind,
            granted_by: UserId(parse_uuid(&self.granted_by)?),
            granted_at: from_timestamp(self.granted_at)?,
            expires_at: from_optional_timestamp(self.expires_at)?,
        })
    }
}

const GRANT_COLUMNS: &str =
    "id, user_id, permission_id, process_id, stage_id, granted_by, granted_at, expires_at";

/// Storage key columns for a kind; absent ids become the '' sentinel.
fn key_columns(kind: &GrantKind) -> (String, String) {
    let permission = kind
        .permission_id()
        .map(|p| p.to_string())
        .unwrap_or_default();
    let stage = kind.stage_id().map(|s| s.to_string()).unwrap_or_default();
    (permission, stage)
}

fn to_rows(rows: Vec<GrantRow>) -> Result<Vec<Grant>, StoreError> {
    rows.into_iter().map(GrantRow::into_grant).collect()
}

#[async_trait::async_trait]
impl GrantStore for SqliteStore {
    async fn upsert_grant(&self, params: &UpsertGrantParams) -> Result<Grant, StoreError> {
        let (permission_key, stage_key) = key_columns(&params.kind);

        // Single statement: the unique key resolves concurrent grants of the same key.
        let row = sqlx::query_as::<_, GrantRow>(&format!(
            "INSERT INTO grants(id, user_id, permission_id, process_id, stage_id,
                                granted_by, granted_at, expires_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, permission_id, process_id, stage_id)
             DO UPDATE SET granted_by = excluded.granted_by,
                           granted_at = excluded.granted_at,
                           expires_at = excluded.expires_at
             RETURNING {GRANT_COLUMNS}"
        ))
        .bind(GrantId::new().to_string())
        .bind(params.user_id.to_string())
        .bind(permission_key)
        .bind(params.process_id.to_string())
        .bind(stage_key)
        .bind(params.granted_by.to_string())
        .bind(now_secs())
        .bind(params.expires_at.map(|t| t.timestamp()))
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_err)?;

        row.into_grant()
    }

    async fn delete_grants(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        process_id: &ProcessId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM grants WHERE user_id = ? AND permission_id = ? AND process_id = ?",
        )
        .bind(user_id.to_string())
        .bind(permission_id.to_string())
        .bind(process_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn count_grants(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        process_id: &ProcessId,
    ) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM grants WHERE user_id = ? AND permission_id = ? AND process_id = ?",
        )
        .bind(user_id.to_string())
        .bind(permission_id.to_string())
        .bind(process_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(count as u64)
    }

    async fn list_grant_processes(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
    ) -> Result<Vec<ProcessId>, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT DISTINCT process_id FROM grants
              WHERE user_id = ? AND permission_id = ?
              ORDER BY process_id",
        )
        .bind(user_id.to_string())
        .bind(permission_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter()
            .map(|(id,)| parse_uuid(&id).map(ProcessId))
            .collect()
    }

    async fn delete_grants_for_process(
        &self,
        process_id: &ProcessId,
        user_id: &UserId,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM grants WHERE process_id = ? AND user_id = ?")
            .bind(process_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        Ok(result.rows_affected())
    }

    async fn list_grants_for_user(&self, user_id: &UserId) -> Result<Vec<Grant>, StoreError> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants WHERE user_id = ? ORDER BY process_id, granted_at, id"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        to_rows(rows)
    }

    async fn list_grants_for_process(
        &self,
        process_id: &ProcessId,
    ) -> Result<Vec<Grant>, StoreError> {
        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS} FROM grants WHERE process_id = ? ORDER BY user_id, granted_at, id"
        ))
        .bind(process_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        to_rows(rows)
    }
}

#[async_trait::async_trait]
impl SubjectSnapshots for SqliteStore {
    async fn load_subject(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<SubjectSnapshot, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let role: Option<(Option<String>,)> =
            sqlx::query_as("SELECT role_id FROM users WHERE id = ?")
                .bind(user_id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(backend)?;
        let role_id = match role {
            Some((Some(id),)) => Some(RoleId(parse_uuid(&id)?)),
            _ => None,
        };

        // Deactivated roles confer nothing.
        let mut role_permission_ids = Vec::new();
        if let Some(role_id) = &role_id {
            let rows = sqlx::query_as::<_, (String,)>(
                "SELECT rp.permission_id
                   FROM role_permissions rp
                   JOIN roles r ON r.id = rp.role_id
                  WHERE rp.role_id = ? AND r.is_active = 1
                  ORDER BY rp.permission_id",
            )
            .bind(role_id.to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(backend)?;
            for (id,) in rows {
                role_permission_ids.push(PermissionId(parse_uuid(&id)?));
            }
        }

        let rows = sqlx::query_as::<_, GrantRow>(&format!(
            "SELECT {GRANT_COLUMNS}
               FROM grants
              WHERE user_id = ? AND (expires_at IS NULL OR expires_at > ?)
              ORDER BY process_id, granted_at, id"
        ))
        .bind(user_id.to_string())
        .bind(now.timestamp())
        .fetch_all(&mut *tx)
        .await
        .map_err(backend)?;
        let grants = to_rows(rows)?;

        tx.commit().await.map_err(backend)?;

        Ok(SubjectSnapshot {
            user_id: user_id.clone(),
            role_id,
            role_permission_ids,
            grants,
            as_of: now,
        })
    }
}
