//! Direct, process-scoped grants and the per-user read snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GrantId, PermissionId, ProcessId, RoleId, StageId, UserId};

/// What a grant row confers.
///
/// A grant is either a capability (optionally narrowed to one stage) or a bare stage
/// membership. There is no state with neither a permission nor a stage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrantKind {
    Capability {
        permission_id: PermissionId,
        stage_id: Option<StageId>,
    },
    StageMembership {
        stage_id: StageId,
    },
}

impl GrantKind {
    /// Build a kind from the nullable pair used at the edges (CLI, storage rows).
    /// Returns `None` when both parts are absent.
    pub fn from_parts(permission_id: Option<PermissionId>, stage_id: Option<StageId>) -> Option<Self> {
        match (permission_id, stage_id) {
            (Some(permission_id), stage_id) => Some(GrantKind::Capability {
                permission_id,
                stage_id,
            }),
            (None, Some(stage_id)) => Some(GrantKind::StageMembership { stage_id }),
            (None, None) => None,
        }
    }

    pub fn permission_id(&self) -> Option<&PermissionId> {
        match self {
            GrantKind::Capability { permission_id, .. } => Some(permission_id),
            GrantKind::StageMembership { .. } => None,
        }
    }

    pub fn stage_id(&self) -> Option<&StageId> {
        match self {
            GrantKind::Capability { stage_id, .. } => stage_id.as_ref(),
            GrantKind::StageMembership { stage_id } => Some(stage_id),
        }
    }
}

/// Persisted grant row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub id: GrantId,
    pub user_id: UserId,
    pub process_id: ProcessId,
    pub kind: GrantKind,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
    /// `None` means permanent. Expired rows stay in storage and are filtered at read time.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Grant {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            None => true,
            Some(expires_at) => expires_at > now,
        }
    }
}

/// Parameters for the grant upsert. The storage key is
/// `(user_id, permission_id, process_id, stage_id)`; a second upsert with the same key
/// overwrites `granted_by`, `granted_at` and `expires_at`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpsertGrantParams {
    pub user_id: UserId,
    pub process_id: ProcessId,
    pub kind: GrantKind,
    pub granted_by: UserId,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Everything resolution needs for one user, read from a single consistent snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubjectSnapshot {
    pub user_id: UserId,
    pub role_id: Option<RoleId>,
    pub role_permission_ids: Vec<PermissionId>,
    /// Grants that were unexpired at `as_of`.
    pub grants: Vec<Grant>,
    pub as_of: DateTime<Utc>,
}

impl SubjectSnapshot {
    pub fn empty(user_id: UserId, as_of: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role_id: None,
            role_permission_ids: Vec::new(),
            grants: Vec::new(),
            as_of,
        }
    }
}
