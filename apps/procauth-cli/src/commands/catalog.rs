use procauth_storage::{CreatePermissionParams, PermissionFilter, PermissionId};

use super::{print_json, Context};

pub async fn cmd_permission_create(
    ctx: &Context,
    resource: &str,
    action: &str,
    name: &str,
    description: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let permission = ctx
        .authz
        .catalog
        .create(&CreatePermissionParams {
            resource: resource.to_string(),
            action: action.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
        })
        .await?;
    print_json(&permission)
}

pub async fn cmd_permission_list(
    ctx: &Context,
    filter: PermissionFilter,
) -> Result<(), Box<dyn std::error::Error>> {
    let permissions = ctx.authz.catalog.list(&filter).await?;
    print_json(&permissions)
}

pub async fn cmd_permission_show(
    ctx: &Context,
    permission_id: Option<&PermissionId>,
    resource: Option<&str>,
    action: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let permission = match (permission_id, resource, action) {
        (Some(id), _, _) => ctx.authz.catalog.get_by_id(id).await?,
        (None, Some(resource), Some(action)) => {
            ctx.authz
                .catalog
                .get_by_resource_action(resource, action)
                .await?
        }
        _ => return Err("Pass a permission id, or both --resource and --action".into()),
    };
    print_json(&permission)
}
