//! Directory ports backed by local tables, plus the seeding calls an operator (or a test)
//! uses to populate them. The authorization core only ever reads these.

use procauth_storage::{
    DirectoryUser, Process, ProcessDirectory, ProcessId, RoleId, Stage, StageDirectory, StageId,
    StoreError, UserDirectory, UserId,
};

use crate::{backend, from_optional_timestamp, map_write_err, now_secs, parse_uuid, SqliteStore};

impl SqliteStore {
    /// Register a user (or update an existing one) with an optional role.
    pub async fn upsert_user(
        &self,
        user_id: &UserId,
        role_id: Option<&RoleId>,
        display_name: Option<&str>,
    ) -> Result<DirectoryUser, StoreError> {
        sqlx::query(
            "INSERT INTO users(id, role_id, display_name, created_at) VALUES(?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET role_id = excluded.role_id,
                                           display_name = excluded.display_name",
        )
        .bind(user_id.to_string())
        .bind(role_id.map(|r| r.to_string()))
        .bind(display_name)
        .bind(now_secs())
        .execute(&self.pool)
        .await
        .map_err(map_write_err)?;

        tracing::info!(user_id = %user_id, has_role = role_id.is_some(), "user registered");

        Ok(DirectoryUser {
            id: user_id.clone(),
            role_id: role_id.cloned(),
            display_name: display_name.map(str::to_string),
        })
    }

    /// Assign (or clear) the single global role of an existing user.
    pub async fn set_user_role(
        &self,
        user_id: &UserId,
        role_id: Option<&RoleId>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET role_id = ? WHERE id = ?")
            .bind(role_id.map(|r| r.to_string()))
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<DirectoryUser, StoreError> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT role_id, display_name FROM users WHERE id = ?",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let (role_id, display_name) = row.ok_or(StoreError::NotFound)?;
        Ok(DirectoryUser {
            id: user_id.clone(),
            role_id: role_id.as_deref().map(parse_uuid).transpose()?.map(RoleId),
            display_name,
        })
    }

    pub async fn create_process(&self, name: &str) -> Result<Process, StoreError> {
        let id = ProcessId::new();
        sqlx::query("INSERT INTO processes(id, name, created_at) VALUES(?, ?, ?)")
            .bind(id.to_string())
            .bind(name)
            .bind(now_secs())
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        Ok(Process {
            id,
            name: name.to_string(),
            deleted_at: None,
        })
    }

    /// Mark a process deleted. Its grants stay in place.
    pub async fn soft_delete_process(&self, process_id: &ProcessId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE processes SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(now_secs())
        .bind(process_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Create a stage inside a live process.
    pub async fn create_stage(
        &self,
        process_id: &ProcessId,
        name: &str,
    ) -> Result<Stage, StoreError> {
        if !self.process_exists(process_id, false).await? {
            return Err(StoreError::NotFound);
        }

        let id = StageId::new();
        sqlx::query("INSERT INTO stages(id, process_id, name, created_at) VALUES(?, ?, ?, ?)")
            .bind(id.to_string())
            .bind(process_id.to_string())
            .bind(name)
            .bind(now_secs())
            .execute(&self.pool)
            .await
            .map_err(map_write_err)?;

        Ok(Stage {
            id,
            process_id: process_id.clone(),
            name: name.to_string(),
            deleted_at: None,
        })
    }

    pub async fn soft_delete_stage(&self, stage_id: &StageId) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE stages SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now_secs())
                .bind(stage_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserDirectory for SqliteStore {
    async fn user_exists(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn get_user_role_id(&self, user_id: &UserId) -> Result<Option<RoleId>, StoreError> {
        Ok(self.get_user(user_id).await?.role_id)
    }
}

#[async_trait::async_trait]
impl ProcessDirectory for SqliteStore {
    async fn process_exists(
        &self,
        process_id: &ProcessId,
        include_deleted: bool,
    ) -> Result<bool, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM processes WHERE id = ? AND (? OR deleted_at IS NULL)",
        )
        .bind(process_id.to_string())
        .bind(include_deleted)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn get_process(&self, process_id: &ProcessId) -> Result<Process, StoreError> {
        let row = sqlx::query_as::<_, (String, Option<i64>)>(
            "SELECT name, deleted_at FROM processes WHERE id = ?",
        )
        .bind(process_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let (name, deleted_at) = row.ok_or(StoreError::NotFound)?;
        Ok(Process {
            id: process_id.clone(),
            name,
            deleted_at: from_optional_timestamp(deleted_at)?,
        })
    }
}

#[async_trait::async_trait]
impl StageDirectory for SqliteStore {
    async fn stage_exists(&self, stage_id: &StageId) -> Result<bool, StoreError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM stages WHERE id = ? AND deleted_at IS NULL")
                .bind(stage_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        Ok(row.is_some())
    }

    async fn get_stage_process_id(&self, stage_id: &StageId) -> Result<ProcessId, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT process_id FROM stages WHERE id = ?")
            .bind(stage_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        let (process_id,) = row.ok_or(StoreError::NotFound)?;
        Ok(ProcessId(parse_uuid(&process_id)?))
    }
}
