//! Records answered by the user, process and stage directories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ProcessId, RoleId, StageId, UserId};

/// User as seen by this subsystem: an id and at most one global role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: UserId,
    pub role_id: Option<RoleId>,
    pub display_name: Option<String>,
}

/// Soft-deletable process that scopes direct grants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Process {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Step inside exactly one process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub process_id: ProcessId,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}
