use clap::Parser;
use procauth_storage::PermissionFilter;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

use cli::{
    Cli, Command, PermissionCommand, ProcessCommand, ReportCommand, RoleCommand, StageCommand,
    UserCommand,
};
use commands::*;
use config::CliConfig;

// ────────────────────────────────────── Main ──────────────────────────────────────

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match CliConfig::from_env() {
        Ok(config) => config.with_flags(cli.database_url.clone(), cli.actor.clone()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // stdout carries JSON results only.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command, config).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config).await?;

    match command {
        Command::Permission { permission_cmd } => match permission_cmd {
            PermissionCommand::Create {
                resource,
                action,
                name,
                description,
            } => {
                cmd_permission_create(&ctx, &resource, &action, &name, description.as_deref())
                    .await?;
            }
            PermissionCommand::List {
                resource,
                action,
                search,
            } => {
                let filter = PermissionFilter {
                    resource,
                    action,
                    search,
                };
                cmd_permission_list(&ctx, filter).await?;
            }
            PermissionCommand::Show {
                permission_id,
                resource,
                action,
            } => {
                cmd_permission_show(
                    &ctx,
                    permission_id.as_ref(),
                    resource.as_deref(),
                    action.as_deref(),
                )
                .await?;
            }
        },
        Command::Role { role_cmd } => match role_cmd {
            RoleCommand::Create {
                name,
                description,
                system,
                permissions,
            } => {
                cmd_role_create(&ctx, &name, description.as_deref(), system, permissions).await?;
            }
            RoleCommand::List => {
                cmd_role_list(&ctx).await?;
            }
            RoleCommand::Show { role } => {
                cmd_role_show(&ctx, &role).await?;
            }
            RoleCommand::Rename { role_id, name } => {
                cmd_role_rename(&ctx, &role_id, &name).await?;
            }
            RoleCommand::Activate { role_id } => {
                cmd_role_set_active(&ctx, &role_id, true).await?;
            }
            RoleCommand::Deactivate { role_id } => {
                cmd_role_set_active(&ctx, &role_id, false).await?;
            }
            RoleCommand::Delete { role_id } => {
                cmd_role_delete(&ctx, &role_id).await?;
            }
            RoleCommand::SetPermissions {
                role_id,
                permission_ids,
            } => {
                cmd_role_set_permissions(&ctx, &role_id, permission_ids).await?;
            }
            RoleCommand::AddPermission {
                role_id,
                permission_id,
            } => {
                cmd_role_add_permission(&ctx, &role_id, &permission_id).await?;
            }
            RoleCommand::RemovePermission {
                role_id,
                permission_id,
            } => {
                cmd_role_remove_permission(&ctx, &role_id, &permission_id).await?;
            }
            RoleCommand::CopyPermissions { from, to } => {
                cmd_role_copy_permissions(&ctx, &from, &to).await?;
            }
        },
        Command::User { user_cmd } => match user_cmd {
            UserCommand::Add { id, name, role } => {
                cmd_user_add(&ctx, id, name.as_deref(), role.as_ref()).await?;
            }
            UserCommand::SetRole {
                user_id,
                role_id,
                clear,
            } => {
                let role_id = if clear { None } else { role_id };
                cmd_user_set_role(&ctx, &user_id, role_id.as_ref()).await?;
            }
        },
        Command::Process { process_cmd } => match process_cmd {
            ProcessCommand::Add { name } => {
                cmd_process_add(&ctx, &name).await?;
            }
            ProcessCommand::Delete { process_id } => {
                cmd_process_delete(&ctx, &process_id).await?;
            }
        },
        Command::Stage { stage_cmd } => match stage_cmd {
            StageCommand::Add { process_id, name } => {
                cmd_stage_add(&ctx, &process_id, &name).await?;
            }
            StageCommand::Delete { stage_id } => {
                cmd_stage_delete(&ctx, &stage_id).await?;
            }
        },
        Command::Grant {
            user_id,
            process_id,
            permission,
            stage,
            expires_at,
        } => {
            cmd_grant(&ctx, &user_id, &process_id, permission, stage, expires_at).await?;
        }
        Command::Revoke {
            user_id,
            permission_id,
            process_id,
        } => {
            cmd_revoke(&ctx, &user_id, &permission_id, &process_id).await?;
        }
        Command::BulkGrant {
            user_id,
            process_id,
            permission_ids,
            expires_at,
        } => {
            cmd_bulk_grant(&ctx, &user_id, &process_id, &permission_ids, expires_at).await?;
        }
        Command::GrantAll {
            process_id,
            user_id,
        } => {
            cmd_grant_all(&ctx, &process_id, &user_id).await?;
        }
        Command::RevokeAll {
            process_id,
            user_id,
        } => {
            cmd_revoke_all(&ctx, &process_id, &user_id).await?;
        }
        Command::Effective { user_id } => {
            cmd_effective(&ctx, &user_id).await?;
        }
        Command::ActiveInactive { user_id } => {
            cmd_active_inactive(&ctx, &user_id).await?;
        }
        Command::Processes { user_id } => {
            cmd_processes(&ctx, &user_id).await?;
        }
        Command::Report { report_cmd } => match report_cmd {
            ReportCommand::User { user_id } => {
                cmd_report_user(&ctx, &user_id).await?;
            }
            ReportCommand::Process { process_id } => {
                cmd_report_process(&ctx, &process_id).await?;
            }
        },
    }

    Ok(())
}
