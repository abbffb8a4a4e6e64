//! Seeding the local user, process and stage tables.

use procauth_storage::{ProcessId, RoleId, StageId, UserId};
use serde_json::json;

use super::{print_json, Context};

pub async fn cmd_user_add(
    ctx: &Context,
    user_id: Option<UserId>,
    name: Option<&str>,
    role_id: Option<&RoleId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let user_id = user_id.unwrap_or_default();
    let user = ctx.store.upsert_user(&user_id, role_id, name).await?;
    print_json(&user)
}

pub async fn cmd_user_set_role(
    ctx: &Context,
    user_id: &UserId,
    role_id: Option<&RoleId>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(role_id) = role_id {
        // Surface an unknown role as such instead of a constraint failure.
        ctx.authz.roles.get_by_id(role_id).await?;
    }
    ctx.store.set_user_role(user_id, role_id).await?;
    print_json(&ctx.store.get_user(user_id).await?)
}

pub async fn cmd_process_add(ctx: &Context, name: &str) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.store.create_process(name).await?)
}

pub async fn cmd_process_delete(
    ctx: &Context,
    process_id: &ProcessId,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.store.soft_delete_process(process_id).await?;
    print_json(&json!({ "deleted": process_id }))
}

pub async fn cmd_stage_add(
    ctx: &Context,
    process_id: &ProcessId,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.store.create_stage(process_id, name).await?)
}

pub async fn cmd_stage_delete(
    ctx: &Context,
    stage_id: &StageId,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.store.soft_delete_stage(stage_id).await?;
    print_json(&json!({ "deleted": stage_id }))
}
