use std::str::FromStr;

use procauth_core::{CreateRoleRequest, UpdateRoleRequest};
use procauth_storage::{PermissionId, RoleId};
use serde_json::json;

use super::{print_json, Context};

pub async fn cmd_role_create(
    ctx: &Context,
    name: &str,
    description: Option<&str>,
    is_system_role: bool,
    permission_ids: Vec<PermissionId>,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = ctx
        .authz
        .roles
        .create(&CreateRoleRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
            is_system_role,
            permission_ids,
        })
        .await?;
    print_json(&role)
}

pub async fn cmd_role_list(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.authz.roles.list().await?)
}

/// Accepts a role id or a role name.
pub async fn cmd_role_show(ctx: &Context, role: &str) -> Result<(), Box<dyn std::error::Error>> {
    let role = match RoleId::from_str(role) {
        Ok(id) => ctx.authz.roles.get_by_id(&id).await?,
        Err(_) => ctx
            .authz
            .roles
            .find_by_name(role)
            .await?
            .ok_or_else(|| format!("Role '{}' not found", role))?,
    };
    let permissions = ctx.authz.roles.get_permissions(&role.id).await?;
    print_json(&json!({ "role": role, "permissions": permissions }))
}

pub async fn cmd_role_rename(
    ctx: &Context,
    role_id: &RoleId,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = ctx
        .authz
        .roles
        .update(
            role_id,
            &UpdateRoleRequest {
                name: Some(name.to_string()),
                ..Default::default()
            },
        )
        .await?;
    print_json(&role)
}

pub async fn cmd_role_set_active(
    ctx: &Context,
    role_id: &RoleId,
    is_active: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let role = ctx
        .authz
        .roles
        .update(
            role_id,
            &UpdateRoleRequest {
                is_active: Some(is_active),
                ..Default::default()
            },
        )
        .await?;
    print_json(&role)
}

pub async fn cmd_role_set_permissions(
    ctx: &Context,
    role_id: &RoleId,
    permission_ids: Vec<PermissionId>,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.authz
        .roles
        .update(
            role_id,
            &UpdateRoleRequest {
                permission_ids: Some(permission_ids),
                ..Default::default()
            },
        )
        .await?;
    print_json(&ctx.authz.roles.get_permissions(role_id).await?)
}

pub async fn cmd_role_delete(
    ctx: &Context,
    role_id: &RoleId,
) -> Result<(), Box<dyn std::error::Error>> {
    ctx.authz.roles.delete(role_id).await?;
    print_json(&json!({ "deleted": role_id }))
}

pub async fn cmd_role_add_permission(
    ctx: &Context,
    role_id: &RoleId,
    permission_id: &PermissionId,
) -> Result<(), Box<dyn std::error::Error>> {
    let link = ctx.authz.roles.add_permission(role_id, permission_id).await?;
    print_json(&json!({ "result": link }))
}

pub async fn cmd_role_remove_permission(
    ctx: &Context,
    role_id: &RoleId,
    permission_id: &PermissionId,
) -> Result<(), Box<dyn std::error::Error>> {
    let removed = ctx
        .authz
        .roles
        .remove_permission(role_id, permission_id)
        .await?;
    print_json(&json!({ "removed": removed }))
}

pub async fn cmd_role_copy_permissions(
    ctx: &Context,
    from: &RoleId,
    to: &RoleId,
) -> Result<(), Box<dyn std::error::Error>> {
    let copied = ctx.authz.roles.copy_permissions(from, to).await?;
    print_json(&json!({ "copied": copied }))
}
