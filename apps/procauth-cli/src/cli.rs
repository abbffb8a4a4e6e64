use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use procauth_storage::{PermissionId, ProcessId, RoleId, StageId, UserId};

#[derive(Parser)]
#[command(name = "procauth")]
#[command(about = "Process-scoped permission management")]
pub struct Cli {
    /// SQLite database URL (overrides PROCAUTH_DATABASE_URL; default ~/.procauth/store.db)
    #[arg(long)]
    pub database_url: Option<String>,

    /// User recorded as the granting user (overrides PROCAUTH_ACTOR)
    #[arg(long)]
    pub actor: Option<UserId>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Permission catalog commands
    Permission {
        #[command(subcommand)]
        permission_cmd: PermissionCommand,
    },
    /// Role commands
    Role {
        #[command(subcommand)]
        role_cmd: RoleCommand,
    },
    /// User directory commands
    User {
        #[command(subcommand)]
        user_cmd: UserCommand,
    },
    /// Process directory commands
    Process {
        #[command(subcommand)]
        process_cmd: ProcessCommand,
    },
    /// Stage directory commands
    Stage {
        #[command(subcommand)]
        stage_cmd: StageCommand,
    },
    /// Grant a permission (and/or stage membership) to a user inside a process
    Grant {
        user_id: UserId,
        process_id: ProcessId,
        #[arg(long)]
        permission: Option<PermissionId>,
        #[arg(long)]
        stage: Option<StageId>,
        /// RFC 3339 timestamp; omit for a permanent grant
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Revoke a permission from a user in a process (all stages)
    Revoke {
        user_id: UserId,
        permission_id: PermissionId,
        process_id: ProcessId,
    },
    /// Grant several permissions; failures are reported per item
    BulkGrant {
        user_id: UserId,
        process_id: ProcessId,
        #[arg(required = true)]
        permission_ids: Vec<PermissionId>,
        #[arg(long)]
        expires_at: Option<DateTime<Utc>>,
    },
    /// Grant the whole catalog to a user in a process
    GrantAll {
        process_id: ProcessId,
        user_id: UserId,
    },
    /// Remove every grant of a user in a process
    RevokeAll {
        process_id: ProcessId,
        user_id: UserId,
    },
    /// List effective permissions (role and direct)
    Effective { user_id: UserId },
    /// Split the catalog into held and not-held permissions
    ActiveInactive { user_id: UserId },
    /// List processes where the user holds direct grants
    Processes { user_id: UserId },
    /// Administrative summaries
    Report {
        #[command(subcommand)]
        report_cmd: ReportCommand,
    },
}

#[derive(Subcommand)]
pub enum PermissionCommand {
    /// Add a catalog entry
    Create {
        resource: String,
        action: String,
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List catalog entries
    List {
        #[arg(long)]
        resource: Option<String>,
        #[arg(long)]
        action: Option<String>,
        /// Case-insensitive match on name or description
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one entry by id, or by --resource and --action
    Show {
        permission_id: Option<PermissionId>,
        #[arg(long, requires = "action", conflicts_with = "permission_id")]
        resource: Option<String>,
        #[arg(long, requires = "resource")]
        action: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum RoleCommand {
    /// Create a role, optionally with initial permissions
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        system: bool,
        #[arg(long = "permission")]
        permissions: Vec<PermissionId>,
    },
    /// List roles
    List,
    /// Show a role by id or name, with its permissions
    Show { role: String },
    Rename { role_id: RoleId, name: String },
    Activate { role_id: RoleId },
    Deactivate { role_id: RoleId },
    Delete { role_id: RoleId },
    /// Replace the role's permission set
    SetPermissions {
        role_id: RoleId,
        permission_ids: Vec<PermissionId>,
    },
    AddPermission {
        role_id: RoleId,
        permission_id: PermissionId,
    },
    RemovePermission {
        role_id: RoleId,
        permission_id: PermissionId,
    },
    /// Copy all permissions of one role onto another
    CopyPermissions { from: RoleId, to: RoleId },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a user (a new id is generated unless --id is given)
    Add {
        #[arg(long)]
        id: Option<UserId>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<RoleId>,
    },
    /// Assign a role, or clear it with --clear
    SetRole {
        user_id: UserId,
        #[arg(required_unless_present = "clear")]
        role_id: Option<RoleId>,
        #[arg(long, conflicts_with = "role_id")]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum ProcessCommand {
    Add { name: String },
    /// Soft-delete a process; its grants remain
    Delete { process_id: ProcessId },
}

#[derive(Subcommand)]
pub enum StageCommand {
    Add { process_id: ProcessId, name: String },
    /// Soft-delete a stage
    Delete { stage_id: StageId },
}

#[derive(Subcommand)]
pub enum ReportCommand {
    User { user_id: UserId },
    Process { process_id: ProcessId },
}
