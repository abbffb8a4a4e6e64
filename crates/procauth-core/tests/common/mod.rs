//! Shared fixture: an in-memory SQLite store with two users, an admin and two processes.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use procauth_core::{Authz, GrantRequest, Ports};
use procauth_storage::{
    CreatePermissionParams, Permission, PermissionId, Process, ProcessId, StageId, UserId,
};
use procauth_store_sqlite::SqliteStore;

pub struct Fixture {
    pub store: Arc<SqliteStore>,
    pub authz: Authz,
    pub admin: UserId,
    pub user: UserId,
    pub process_a: Process,
    pub process_b: Process,
}

pub async fn fixture() -> Fixture {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());

    let admin = UserId::new();
    store.upsert_user(&admin, None, Some("admin")).await.unwrap();
    let user = UserId::new();
    store.upsert_user(&user, None, Some("agent")).await.unwrap();

    let process_a = store.create_process("Onboarding").await.unwrap();
    let process_b = store.create_process("Billing").await.unwrap();

    let authz = Authz::new(Ports::from_store(store.clone()));
    Fixture {
        store,
        authz,
        admin,
        user,
        process_a,
        process_b,
    }
}

pub fn permission_params(resource: &str, action: &str) -> CreatePermissionParams {
    CreatePermissionParams {
        resource: resource.to_string(),
        action: action.to_string(),
        name: format!("{} {}", action, resource),
        description: None,
    }
}

impl Fixture {
    pub async fn permission(&self, resource: &str, action: &str) -> Permission {
        self.authz
            .catalog
            .create(&permission_params(resource, action))
            .await
            .unwrap()
    }

    /// Capability grant to the fixture user, made by the admin.
    pub fn request(
        &self,
        permission_id: &PermissionId,
        process_id: &ProcessId,
        stage_id: Option<&StageId>,
        expires_at: Option<DateTime<Utc>>,
    ) -> GrantRequest {
        GrantRequest {
            user_id: self.user.clone(),
            permission_id: Some(permission_id.clone()),
            process_id: process_id.clone(),
            stage_id: stage_id.cloned(),
            expires_at,
            granted_by: self.admin.clone(),
        }
    }
}
