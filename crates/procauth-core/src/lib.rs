//! Process-scoped authorization for procauth.
//!
//! Decides which capabilities a user holds by merging the permissions of their single
//! global role with permissions granted directly to them inside a process (and optionally
//! a stage of that process).
//!
//! # Architecture
//!
//! - [`CatalogService`] and [`RoleService`] guard the permission catalog and role bundles.
//! - [`GrantManager`] is the write path: validates, then upserts/deletes grant rows.
//! - [`ResolutionEngine`] is the read path: merges role and unexpired direct grants at
//!   read time. There is no cached effective-permission blob.
//! - [`Reporting`] composes resolution output into administrative summaries.
//!
//! Every service talks to storage only through the ports bundled in [`Ports`].

use std::sync::Arc;

use procauth_storage::{
    CatalogStore, GrantStore, ProcessDirectory, RoleStore, StageDirectory, SubjectSnapshots,
    UserDirectory,
};

mod catalog;
mod error;
mod grants;
mod reporting;
mod resolution;
mod roles;

pub use catalog::CatalogService;
pub use error::AuthzError;
pub use grants::{
    BulkGrantItem, BulkGrantOutcome, BulkGrantSummary, GrantAllOutcome, GrantFailure,
    GrantManager, GrantRequest, RevokeAllOutcome, RevokeOutcome,
};
pub use reporting::{
    PermissionRef, ProcessAccessSummary, ProcessSummary, ProcessUserSummary, Reporting,
    RoleSummary, UserPermissionSummary,
};
pub use resolution::{
    ActiveAndInactive, ActivePermission, EffectivePermission, PermissionSource,
    ProcessPermission, ResolutionEngine, UserProcessAccess,
};
pub use roles::{CreateRoleRequest, RoleLink, RoleService, UpdateRoleRequest};

/// Injected storage handles.
#[derive(Clone)]
pub struct Ports {
    pub catalog: Arc<dyn CatalogStore>,
    pub roles: Arc<dyn RoleStore>,
    pub grants: Arc<dyn GrantStore>,
    pub snapshots: Arc<dyn SubjectSnapshots>,
    pub users: Arc<dyn UserDirectory>,
    pub processes: Arc<dyn ProcessDirectory>,
    pub stages: Arc<dyn StageDirectory>,
}

impl Ports {
    /// Use one backend for every port.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CatalogStore
            + RoleStore
            + GrantStore
            + SubjectSnapshots
            + UserDirectory
            + ProcessDirectory
            + StageDirectory
            + 'static,
    {
        Self {
            catalog: store.clone(),
            roles: store.clone(),
            grants: store.clone(),
            snapshots: store.clone(),
            users: store.clone(),
            processes: store.clone(),
            stages: store,
        }
    }
}

/// All services over one set of ports.
#[derive(Clone)]
pub struct Authz {
    pub catalog: CatalogService,
    pub roles: RoleService,
    pub grants: GrantManager,
    pub resolution: ResolutionEngine,
    pub reporting: Reporting,
}

impl Authz {
    pub fn new(ports: Ports) -> Self {
        Self {
            catalog: CatalogService::new(ports.clone()),
            roles: RoleService::new(ports.clone()),
            grants: GrantManager::new(ports.clone()),
            resolution: ResolutionEngine::new(ports.clone()),
            reporting: Reporting::new(ports),
        }
    }
}
