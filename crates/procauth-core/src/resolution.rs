//! Read path: merge a user's role permissions with their unexpired direct grants.
//!
//! Nothing is cached. Every query loads one [`SubjectSnapshot`] (role, role permissions
//! and unexpired grants read together) and derives its answer from it, so a revoke or
//! expiry is visible on the next read.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use procauth_storage::{
    Grant, Permission, PermissionFilter, PermissionId, Process, ProcessId, StageId, StoreError,
    SubjectSnapshot, UserId,
};
use serde::Serialize;

use crate::{AuthzError, Ports};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSource {
    Role,
    Direct,
}

/// One entry of the effective permission list. Role entries carry no process.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EffectivePermission {
    pub permission_id: PermissionId,
    pub source: PermissionSource,
    pub process_id: Option<ProcessId>,
}

/// Catalog entry held by the user, with where it comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActivePermission {
    #[serde(flatten)]
    pub permission: Permission,
    /// `Role` wins when the permission is held both ways.
    pub source: PermissionSource,
    /// Processes with an unexpired direct grant of this permission.
    pub process_ids: Vec<ProcessId>,
    /// From the longest-lived direct grant; absent for role-only permissions.
    pub granted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActiveAndInactive {
    pub active: Vec<ActivePermission>,
    pub inactive: Vec<Permission>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessPermission {
    pub permission_id: PermissionId,
    pub stage_id: Option<StageId>,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A process in which the user holds at least one unexpired direct grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserProcessAccess {
    pub process_id: ProcessId,
    /// `None` when the process directory no longer knows the process.
    pub process: Option<Process>,
    pub permissions: Vec<ProcessPermission>,
    pub stage_ids: Vec<StageId>,
    pub permission_count: usize,
    pub stage_count: usize,
}

/// Answers "what can this user do" queries.
#[derive(Clone)]
pub struct ResolutionEngine {
    ports: Ports,
}

impl ResolutionEngine {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Role permissions first (no process), then one entry per distinct
    /// (permission, process) among unexpired direct capability grants.
    ///
    /// An unknown user, or a user with neither role nor grants, yields an empty list.
    pub async fn effective_permissions(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<EffectivePermission>, AuthzError> {
        let snapshot = self.snapshot(user_id).await?;
        Ok(merge_effective(&snapshot))
    }

    /// Partition the whole catalog into what the user holds and what they don't.
    pub async fn active_and_inactive(
        &self,
        user_id: &UserId,
    ) -> Result<ActiveAndInactive, AuthzError> {
        let snapshot = self.snapshot(user_id).await?;
        let catalog = self
            .ports
            .catalog
            .list_permissions(&PermissionFilter::default())
            .await?;
        Ok(partition_catalog(catalog, &snapshot))
    }

    /// Distinct processes with at least one unexpired direct grant, each with its grants.
    /// Role permissions are not process-scoped and never appear here.
    pub async fn processes_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<UserProcessAccess>, AuthzError> {
        let snapshot = self.snapshot(user_id).await?;

        let mut by_process: BTreeMap<ProcessId, Vec<&Grant>> = BTreeMap::new();
        for grant in &snapshot.grants {
            by_process
                .entry(grant.process_id.clone())
                .or_default()
                .push(grant);
        }

        let mut out = Vec::with_capacity(by_process.len());
        for (process_id, grants) in by_process {
            let process = match self.ports.processes.get_process(&process_id).await {
                Ok(p) => Some(p),
                Err(StoreError::NotFound) => None,
                Err(e) => return Err(e.into()),
            };
            out.push(summarize_process(process_id, process, &grants));
        }
        Ok(out)
    }

    async fn snapshot(&self, user_id: &UserId) -> Result<SubjectSnapshot, AuthzError> {
        let snapshot = self
            .ports
            .snapshots
            .load_subject(user_id, Utc::now())
            .await?;
        tracing::debug!(
            user_id = %user_id,
            role_permissions = snapshot.role_permission_ids.len(),
            grants = snapshot.grants.len(),
            "subject snapshot loaded"
        );
        Ok(snapshot)
    }
}

/// Grants are re-checked against `as_of` so a snapshot from any source is treated alike.
fn live_grants(snapshot: &SubjectSnapshot) -> impl Iterator<Item = &Grant> {
    snapshot
        .grants
        .iter()
        .filter(move |g| g.is_active_at(snapshot.as_of))
}

pub(crate) fn merge_effective(snapshot: &SubjectSnapshot) -> Vec<EffectivePermission> {
    let mut out = Vec::new();

    let mut role_seen = HashSet::new();
    for permission_id in &snapshot.role_permission_ids {
        if role_seen.insert(permission_id) {
            out.push(EffectivePermission {
                permission_id: permission_id.clone(),
                source: PermissionSource::Role,
                process_id: None,
            });
        }
    }

    // Several stage-scoped grants of one permission in one process collapse to one entry.
    let mut direct_seen = HashSet::new();
    for grant in live_grants(snapshot) {
        let Some(permission_id) = grant.kind.permission_id() else {
            continue;
        };
        if direct_seen.insert((permission_id, &grant.process_id)) {
            out.push(EffectivePermission {
                permission_id: permission_id.clone(),
                source: PermissionSource::Direct,
                process_id: Some(grant.process_id.clone()),
            });
        }
    }

    out
}

pub(crate) fn partition_catalog(
    catalog: Vec<Permission>,
    snapshot: &SubjectSnapshot,
) -> ActiveAndInactive {
    let role: HashSet<&PermissionId> = snapshot.role_permission_ids.iter().collect();

    let mut direct: HashMap<&PermissionId, Vec<&Grant>> = HashMap::new();
    for grant in live_grants(snapshot) {
        if let Some(permission_id) = grant.kind.permission_id() {
            direct.entry(permission_id).or_default().push(grant);
        }
    }

    let mut result = ActiveAndInactive::default();
    for permission in catalog {
        let from_role = role.contains(&permission.id);
        let grants = direct.get(&permission.id);

        if !from_role && grants.is_none() {
            result.inactive.push(permission);
            continue;
        }

        let process_ids: Vec<ProcessId> = grants
            .map(|gs| {
                gs.iter()
                    .map(|g| g.process_id.clone())
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            })
            .unwrap_or_default();

        let (source, granted_at, expires_at) = if from_role {
            (PermissionSource::Role, None, None)
        } else {
            let best = grants.and_then(|gs| longest_lived(gs));
            (
                PermissionSource::Direct,
                best.map(|g| g.granted_at),
                best.and_then(|g| g.expires_at),
            )
        };

        result.active.push(ActivePermission {
            permission,
            source,
            process_ids,
            granted_at,
            expires_at,
        });
    }
    result
}

/// Permanent beats any expiry; among equals the most recent grant wins.
fn longest_lived<'a>(grants: &[&'a Grant]) -> Option<&'a Grant> {
    grants.iter().copied().max_by(|a, b| {
        let expiry = match (a.expires_at, b.expires_at) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(x), Some(y)) => x.cmp(&y),
        };
        expiry.then(a.granted_at.cmp(&b.granted_at))
    })
}

fn summarize_process(
    process_id: ProcessId,
    process: Option<Process>,
    grants: &[&Grant],
) -> UserProcessAccess {
    let mut permissions = Vec::new();
    let mut permission_ids = BTreeSet::new();
    let mut stage_ids = BTreeSet::new();

    for grant in grants {
        if let Some(stage_id) = grant.kind.stage_id() {
            stage_ids.insert(stage_id.clone());
        }
        if let Some(permission_id) = grant.kind.permission_id() {
            permission_ids.insert(permission_id.clone());
            permissions.push(ProcessPermission {
                permission_id: permission_id.clone(),
                stage_id: grant.kind.stage_id().cloned(),
                granted_at: grant.granted_at,
                expires_at: grant.expires_at,
            });
        }
    }

    UserProcessAccess {
        process_id,
        process,
        permission_count: permission_ids.len(),
        stage_count: stage_ids.len(),
        permissions,
        stage_ids: stage_ids.into_iter().collect(),
    }
}
