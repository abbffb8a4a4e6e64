use chrono::{DateTime, Utc};
use procauth_core::GrantRequest;
use procauth_storage::{PermissionId, ProcessId, StageId, UserId};

use super::{print_json, Context};

pub async fn cmd_grant(
    ctx: &Context,
    user_id: &UserId,
    process_id: &ProcessId,
    permission_id: Option<PermissionId>,
    stage_id: Option<StageId>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let granted_by = ctx.config.require_actor()?;
    let grant = ctx
        .authz
        .grants
        .grant(&GrantRequest {
            user_id: user_id.clone(),
            permission_id,
            process_id: process_id.clone(),
            stage_id,
            expires_at,
            granted_by,
        })
        .await?;
    print_json(&grant)
}

pub async fn cmd_revoke(
    ctx: &Context,
    user_id: &UserId,
    permission_id: &PermissionId,
    process_id: &ProcessId,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = ctx
        .authz
        .grants
        .revoke(user_id, permission_id, process_id)
        .await?;
    print_json(&outcome)
}

pub async fn cmd_bulk_grant(
    ctx: &Context,
    user_id: &UserId,
    process_id: &ProcessId,
    permission_ids: &[PermissionId],
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let granted_by = ctx.config.require_actor()?;
    let outcome = ctx
        .authz
        .grants
        .bulk_grant(user_id, permission_ids, process_id, expires_at, &granted_by)
        .await;
    print_json(&outcome)
}

pub async fn cmd_grant_all(
    ctx: &Context,
    process_id: &ProcessId,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let granted_by = ctx.config.require_actor()?;
    let outcome = ctx
        .authz
        .grants
        .grant_all_for_process(process_id, user_id, &granted_by)
        .await?;
    print_json(&outcome)
}

pub async fn cmd_revoke_all(
    ctx: &Context,
    process_id: &ProcessId,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = ctx
        .authz
        .grants
        .revoke_all_for_process(process_id, user_id)
        .await?;
    print_json(&outcome)
}
