use procauth_storage::{ProcessId, UserId};

use super::{print_json, Context};

pub async fn cmd_effective(
    ctx: &Context,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.authz.resolution.effective_permissions(user_id).await?)
}

pub async fn cmd_active_inactive(
    ctx: &Context,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.authz.resolution.active_and_inactive(user_id).await?)
}

pub async fn cmd_processes(
    ctx: &Context,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.authz.resolution.processes_for_user(user_id).await?)
}

pub async fn cmd_report_user(
    ctx: &Context,
    user_id: &UserId,
) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.authz.reporting.user_summary(user_id).await?)
}

pub async fn cmd_report_process(
    ctx: &Context,
    process_id: &ProcessId,
) -> Result<(), Box<dyn std::error::Error>> {
    print_json(&ctx.authz.reporting.process_summary(process_id).await?)
}
