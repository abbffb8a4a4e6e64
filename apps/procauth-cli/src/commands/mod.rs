pub mod access;
pub mod catalog;
pub mod directory;
pub mod grant;
pub mod role;

use std::sync::Arc;

use procauth_core::{Authz, Ports};
use procauth_store_sqlite::SqliteStore;
use serde::Serialize;

use crate::config::CliConfig;

pub use access::{
    cmd_active_inactive, cmd_effective, cmd_processes, cmd_report_process, cmd_report_user,
};
pub use catalog::{cmd_permission_create, cmd_permission_list, cmd_permission_show};
pub use directory::{
    cmd_process_add, cmd_process_delete, cmd_stage_add, cmd_stage_delete, cmd_user_add,
    cmd_user_set_role,
};
pub use grant::{cmd_bulk_grant, cmd_grant, cmd_grant_all, cmd_revoke, cmd_revoke_all};
pub use role::{
    cmd_role_add_permission, cmd_role_copy_permissions, cmd_role_create, cmd_role_delete,
    cmd_role_list, cmd_role_remove_permission, cmd_role_rename, cmd_role_set_active,
    cmd_role_set_permissions, cmd_role_show,
};

/// Opened store plus the services over it.
pub struct Context {
    pub config: CliConfig,
    pub store: Arc<SqliteStore>,
    pub authz: Authz,
}

impl Context {
    pub async fn open(config: CliConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = match &config.database_url {
            Some(url) => SqliteStore::open(url).await?,
            None => SqliteStore::open_default().await?,
        };
        tracing::debug!(
            default_location = config.database_url.is_none(),
            actor = ?config.actor,
            "store opened"
        );
        let store = Arc::new(store);
        let authz = Authz::new(Ports::from_store(store.clone()));
        Ok(Self {
            config,
            store,
            authz,
        })
    }
}

/// Pretty JSON on stdout; logs go to stderr.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use procauth_storage::{PermissionFilter, UserId};

    async fn memory_context(actor: Option<UserId>) -> Context {
        Context::open(CliConfig {
            database_url: Some("sqlite::memory:".into()),
            actor,
            log_filter: "info".into(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_grant_flow_through_commands() {
        let admin = UserId::new();
        let ctx = memory_context(Some(admin.clone())).await;
        let user = UserId::new();

        cmd_user_add(&ctx, Some(admin.clone()), Some("admin"), None)
            .await
            .unwrap();
        cmd_user_add(&ctx, Some(user.clone()), Some("agent"), None)
            .await
            .unwrap();
        cmd_permission_create(&ctx, "ticket", "read", "Read tickets", None)
            .await
            .unwrap();
        let process = ctx.store.create_process("Onboarding").await.unwrap();
        let permission = ctx
            .authz
            .catalog
            .list(&PermissionFilter::default())
            .await
            .unwrap()
            .remove(0);

        cmd_grant(&ctx, &user, &process.id, Some(permission.id.clone()), None, None)
            .await
            .unwrap();
        let effective = ctx
            .authz
            .resolution
            .effective_permissions(&user)
            .await
            .unwrap();
        assert_eq!(effective.len(), 1);

        cmd_revoke(&ctx, &user, &permission.id, &process.id)
            .await
            .unwrap();
        assert!(cmd_revoke(&ctx, &user, &permission.id, &process.id)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_grant_commands_need_an_actor() {
        let ctx = memory_context(None).await;
        let err = cmd_grant_all(&ctx, &procauth_storage::ProcessId::new(), &UserId::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("PROCAUTH_ACTOR"));
    }
}
