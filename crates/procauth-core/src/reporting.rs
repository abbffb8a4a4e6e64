//! Administrative summaries built from resolution output and the directories.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use procauth_storage::{
    Permission, PermissionFilter, PermissionId, Process, ProcessId, RoleId, StageId, StoreError,
    UserId,
};
use serde::Serialize;

use crate::resolution::{ActivePermission, PermissionSource, UserProcessAccess};
use crate::{AuthzError, Ports, ResolutionEngine};

/// Short, display-oriented view of a catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionRef {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    pub name: String,
}

impl From<&Permission> for PermissionRef {
    fn from(p: &Permission) -> Self {
        Self {
            id: p.id.clone(),
            resource: p.resource.clone(),
            action: p.action.clone(),
            name: p.name.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RoleSummary {
    pub id: RoleId,
    pub name: String,
    pub is_active: bool,
    pub is_system_role: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub process_id: ProcessId,
    pub name: Option<String>,
    /// Soft-deleted processes are still listed; their grants keep resolving.
    pub deleted: bool,
    pub permission_count: usize,
    pub stage_count: usize,
    pub permissions: Vec<PermissionRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserPermissionSummary {
    pub user_id: UserId,
    pub role: Option<RoleSummary>,
    pub catalog_size: usize,
    pub active_count: usize,
    pub inactive_count: usize,
    pub role_permission_count: usize,
    pub direct_permission_count: usize,
    /// Active permissions grouped by resource.
    pub by_resource: BTreeMap<String, Vec<ActivePermission>>,
    pub processes: Vec<ProcessSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessUserSummary {
    pub user_id: UserId,
    pub permissions: Vec<PermissionRef>,
    pub stage_ids: Vec<StageId>,
    /// Earliest expiry among the user's grants here; `None` if all are permanent.
    pub next_expiry: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProcessAccessSummary {
    pub process: Process,
    pub total_grants: usize,
    pub active_grants: usize,
    pub expired_grants: usize,
    pub users: Vec<ProcessUserSummary>,
    pub generated_at: DateTime<Utc>,
}

/// Builds summaries for administrators.
#[derive(Clone)]
pub struct Reporting {
    ports: Ports,
    resolution: ResolutionEngine,
}

impl Reporting {
    pub fn new(ports: Ports) -> Self {
        let resolution = ResolutionEngine::new(ports.clone());
        Self { ports, resolution }
    }

    /// Everything a user holds: role, active and inactive counts, active permissions
    /// grouped by resource, and per-process direct access.
    pub async fn user_summary(
        &self,
        user_id: &UserId,
    ) -> Result<UserPermissionSummary, AuthzError> {
        let role_id = self
            .ports
            .users
            .get_user_role_id(user_id)
            .await
            .map_err(AuthzError::lookup(format!("user {user_id}")))?;

        let role = match role_id {
            Some(role_id) => match self.ports.roles.get_role(&role_id).await {
                Ok(r) => Some(RoleSummary {
                    id: r.id,
                    name: r.name,
                    is_active: r.is_active,
                    is_system_role: r.is_system_role,
                }),
                Err(StoreError::NotFound) => None,
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        let split = self.resolution.active_and_inactive(user_id).await?;
        let accesses = self.resolution.processes_for_user(user_id).await?;
        let catalog = self.catalog_index().await?;

        let role_permission_count = split
            .active
            .iter()
            .filter(|a| a.source == PermissionSource::Role)
            .count();
        let active_count = split.active.len();
        let inactive_count = split.inactive.len();

        let mut by_resource: BTreeMap<String, Vec<ActivePermission>> = BTreeMap::new();
        for entry in split.active {
            by_resource
                .entry(entry.permission.resource.clone())
                .or_default()
                .push(entry);
        }

        let processes = accesses
            .iter()
            .map(|a| process_summary_for(a, &catalog))
            .collect();

        Ok(UserPermissionSummary {
            user_id: user_id.clone(),
            role,
            catalog_size: active_count + inactive_count,
            active_count,
            inactive_count,
            role_permission_count,
            direct_permission_count: active_count - role_permission_count,
            by_resource,
            processes,
            generated_at: Utc::now(),
        })
    }

    /// Who holds what inside one process. Expired rows are counted but not listed.
    pub async fn process_summary(
        &self,
        process_id: &ProcessId,
    ) -> Result<ProcessAccessSummary, AuthzError> {
        let process = self
            .ports
            .processes
            .get_process(process_id)
            .await
            .map_err(AuthzError::lookup(format!("process {process_id}")))?;

        let grants = self.ports.grants.list_grants_for_process(process_id).await?;
        let catalog = self.catalog_index().await?;
        let now = Utc::now();

        #[derive(Default)]
        struct Acc {
            permissions: BTreeSet<PermissionId>,
            stages: BTreeSet<StageId>,
            next_expiry: Option<DateTime<Utc>>,
        }

        let mut per_user: BTreeMap<UserId, Acc> = BTreeMap::new();
        let mut active_grants = 0;
        for grant in grants.iter().filter(|g| g.is_active_at(now)) {
            active_grants += 1;
            let acc = per_user.entry(grant.user_id.clone()).or_default();
            if let Some(p) = grant.kind.permission_id() {
                acc.permissions.insert(p.clone());
            }
            if let Some(s) = grant.kind.stage_id() {
                acc.stages.insert(s.clone());
            }
            if let Some(exp) = grant.expires_at {
                acc.next_expiry = Some(acc.next_expiry.map_or(exp, |cur| cur.min(exp)));
            }
        }

        let users = per_user
            .into_iter()
            .map(|(user_id, acc)| ProcessUserSummary {
                user_id,
                permissions: refs(&acc.permissions, &catalog),
                stage_ids: acc.stages.into_iter().collect(),
                next_expiry: acc.next_expiry,
            })
            .collect();

        Ok(ProcessAccessSummary {
            process,
            total_grants: grants.len(),
            active_grants,
            expired_grants: grants.len() - active_grants,
            users,
            generated_at: now,
        })
    }

    async fn catalog_index(&self) -> Result<HashMap<PermissionId, Permission>, AuthzError> {
        let all = self
            .ports
            .catalog
            .list_permissions(&PermissionFilter::default())
            .await?;
        Ok(all.into_iter().map(|p| (p.id.clone(), p)).collect())
    }
}

fn process_summary_for(
    access: &UserProcessAccess,
    catalog: &HashMap<PermissionId, Permission>,
) -> ProcessSummary {
    let ids: BTreeSet<PermissionId> = access
        .permissions
        .iter()
        .map(|p| p.permission_id.clone())
        .collect();

    ProcessSummary {
        process_id: access.process_id.clone(),
        name: access.process.as_ref().map(|p| p.name.clone()),
        deleted: access.process.as_ref().is_some_and(Process::is_deleted),
        permission_count: access.permission_count,
        stage_count: access.stage_count,
        permissions: refs(&ids, catalog),
    }
}

/// Catalog entries for the ids, skipping ids the catalog does not know.
fn refs(
    ids: &BTreeSet<PermissionId>,
    catalog: &HashMap<PermissionId, Permission>,
) -> Vec<PermissionRef> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        match catalog.get(id) {
            Some(p) => out.push(PermissionRef::from(p)),
            None => tracing::warn!(permission_id = %id, "grant references unknown permission"),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(resource: &str, action: &str) -> Permission {
        Permission {
            id: PermissionId::new(),
            resource: resource.into(),
            action: action.into(),
            name: format!("{action} {resource}"),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_refs_skip_unknown_ids() {
        let known = permission("ticket", "read");
        let catalog: HashMap<_, _> = [(known.id.clone(), known.clone())].into_iter().collect();
        let ids: BTreeSet<_> = [known.id.clone(), PermissionId::new()].into_iter().collect();

        let out = refs(&ids, &catalog);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].resource, "ticket");
    }

    #[test]
    fn test_process_summary_flags_deleted_process() {
        let p = permission("ticket", "read");
        let catalog: HashMap<_, _> = [(p.id.clone(), p.clone())].into_iter().collect();
        let process_id = ProcessId::new();
        let access = UserProcessAccess {
            process_id: process_id.clone(),
            process: Some(Process {
                id: process_id,
                name: "Onboarding".into(),
                deleted_at: Some(Utc::now()),
            }),
            permissions: vec![crate::ProcessPermission {
                permission_id: p.id.clone(),
                stage_id: None,
                granted_at: Utc::now(),
                expires_at: None,
            }],
            stage_ids: vec![],
            permission_count: 1,
            stage_count: 0,
        };

        let summary = process_summary_for(&access, &catalog);
        assert!(summary.deleted);
        assert_eq!(summary.name.as_deref(), Some("Onboarding"));
        assert_eq!(summary.permissions.len(), 1);
    }
}
