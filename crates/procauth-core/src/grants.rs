//! Write path for direct grants.
//!
//! Every grant is validated against the directories and the catalog before the single
//! upsert statement runs, so a rejected grant never leaves a row behind. Bulk operations
//! never abort on an item failure; each item reports its own outcome.

use chrono::{DateTime, Utc};
use procauth_storage::{
    Grant, GrantKind, PermissionFilter, PermissionId, ProcessId, StageId, UpsertGrantParams,
    UserId,
};
use serde::{Deserialize, Serialize};

use crate::{AuthzError, Ports};

/// One direct grant as requested at the edge, where permission and stage are both optional.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub user_id: UserId,
    #[serde(default)]
    pub permission_id: Option<PermissionId>,
    pub process_id: ProcessId,
    #[serde(default)]
    pub stage_id: Option<StageId>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: UserId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RevokeOutcome {
    pub deleted: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BulkGrantItem {
    pub permission_id: PermissionId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkGrantSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BulkGrantOutcome {
    pub results: Vec<BulkGrantItem>,
    pub summary: BulkGrantSummary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GrantFailure {
    pub permission_id: PermissionId,
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GrantAllOutcome {
    pub total: usize,
    pub granted: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GrantFailure>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RevokeAllOutcome {
    pub deleted_count: u64,
}

/// Validates and records direct grants, and revokes them.
#[derive(Clone)]
pub struct GrantManager {
    ports: Ports,
}

impl GrantManager {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Create or refresh one direct grant.
    ///
    /// Checks run in a fixed order and the first failure wins: the process must exist and
    /// not be soft-deleted; a given stage must be live and belong to that process; the
    /// user and the granting user must exist; at least one of permission or stage must be
    /// present; a given permission must exist in the catalog. A repeated grant of the same
    /// key overwrites `granted_by`, `granted_at` and `expires_at`.
    pub async fn grant(&self, request: &GrantRequest) -> Result<Grant, AuthzError> {
        let kind = self.validate(request).await?;

        let grant = self
            .ports
            .grants
            .upsert_grant(&UpsertGrantParams {
                user_id: request.user_id.clone(),
                process_id: request.process_id.clone(),
                kind,
                granted_by: request.granted_by.clone(),
                expires_at: request.expires_at,
            })
            .await?;

        tracing::info!(
            grant_id = %grant.id,
            user_id = %grant.user_id,
            process_id = %grant.process_id,
            permission_id = ?grant.kind.permission_id(),
            stage_id = ?grant.kind.stage_id(),
            granted_by = %grant.granted_by,
            expires_at = ?grant.expires_at,
            "grant recorded"
        );
        Ok(grant)
    }

    async fn validate(&self, request: &GrantRequest) -> Result<GrantKind, AuthzError> {
        let process_id = &request.process_id;
        if !self.ports.processes.process_exists(process_id, false).await? {
            return Err(AuthzError::not_found(format!("process {process_id}")));
        }

        if let Some(stage_id) = &request.stage_id {
            if !self.ports.stages.stage_exists(stage_id).await? {
                return Err(AuthzError::not_found(format!("stage {stage_id}")));
            }
            let owner = self
                .ports
                .stages
                .get_stage_process_id(stage_id)
                .await
                .map_err(AuthzError::lookup(format!("stage {stage_id}")))?;
            if &owner != process_id {
                return Err(AuthzError::validation(format!(
                    "stage {stage_id} does not belong to process {process_id}"
                )));
            }
        }

        if !self.ports.users.user_exists(&request.user_id).await? {
            return Err(AuthzError::not_found(format!("user {}", request.user_id)));
        }
        if !self.ports.users.user_exists(&request.granted_by).await? {
            return Err(AuthzError::not_found(format!(
                "granting user {}",
                request.granted_by
            )));
        }

        let kind = GrantKind::from_parts(request.permission_id.clone(), request.stage_id.clone())
            .ok_or_else(|| {
                AuthzError::validation("a grant needs a permission, a stage, or both")
            })?;

        if let Some(permission_id) = kind.permission_id() {
            self.ports
                .catalog
                .get_permission(permission_id)
                .await
                .map_err(AuthzError::lookup(format!("permission {permission_id}")))?;
        }

        Ok(kind)
    }

    /// Remove every grant of `permission_id` to `user_id` inside `process_id`, across all of
    /// the process's stages.
    ///
    /// If nothing matched, the error lists the other processes where the permission is still
    /// granted. After deleting, the key is re-counted and any survivor is an internal error.
    pub async fn revoke(
        &self,
        user_id: &UserId,
        permission_id: &PermissionId,
        process_id: &ProcessId,
    ) -> Result<RevokeOutcome, AuthzError> {
        let deleted = self
            .ports
            .grants
            .delete_grants(user_id, permission_id, process_id)
            .await?;

        if deleted == 0 {
            let other_processes = self
                .ports
                .grants
                .list_grant_processes(user_id, permission_id)
                .await?;
            tracing::debug!(
                user_id = %user_id,
                permission_id = %permission_id,
                process_id = %process_id,
                other_scopes = other_processes.len(),
                "revoke matched no grant"
            );
            return Err(AuthzError::GrantNotFound {
                permission_id: permission_id.clone(),
                process_id: process_id.clone(),
                other_processes,
            });
        }

        let remaining = self
            .ports
            .grants
            .count_grants(user_id, permission_id, process_id)
            .await?;
        if remaining > 0 {
            tracing::error!(
                user_id = %user_id,
                permission_id = %permission_id,
                process_id = %process_id,
                remaining,
                "grant rows survived revoke"
            );
            return Err(AuthzError::Internal(format!(
                "{remaining} grant row(s) remain after revoke"
            )));
        }

        tracing::info!(
            user_id = %user_id,
            permission_id = %permission_id,
            process_id = %process_id,
            deleted,
            "grant revoked"
        );
        Ok(RevokeOutcome { deleted })
    }

    /// Grant each permission in turn. Failures are recorded per item.
    pub async fn bulk_grant(
        &self,
        user_id: &UserId,
        permission_ids: &[PermissionId],
        process_id: &ProcessId,
        expires_at: Option<DateTime<Utc>>,
        granted_by: &UserId,
    ) -> BulkGrantOutcome {
        let mut results = Vec::with_capacity(permission_ids.len());
        let mut summary = BulkGrantSummary {
            total: permission_ids.len(),
            ..Default::default()
        };

        for permission_id in permission_ids {
            let request = GrantRequest {
                user_id: user_id.clone(),
                permission_id: Some(permission_id.clone()),
                process_id: process_id.clone(),
                stage_id: None,
                expires_at,
                granted_by: granted_by.clone(),
            };
            match self.grant(&request).await {
                Ok(_) => {
                    summary.success += 1;
                    results.push(BulkGrantItem {
                        permission_id: permission_id.clone(),
                        success: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        permission_id = %permission_id,
                        process_id = %process_id,
                        error = %e,
                        "bulk grant item failed"
                    );
                    summary.failed += 1;
                    results.push(BulkGrantItem {
                        permission_id: permission_id.clone(),
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        BulkGrantOutcome { results, summary }
    }

    /// Grant every catalog permission, permanently and without a stage, to `user_id` in
    /// `process_id`.
    ///
    /// Only the catalog read can fail the whole call. A permission that disappears from
    /// the catalog between listing and granting is counted as a failed item.
    pub async fn grant_all_for_process(
        &self,
        process_id: &ProcessId,
        user_id: &UserId,
        granted_by: &UserId,
    ) -> Result<GrantAllOutcome, AuthzError> {
        let catalog = self
            .ports
            .catalog
            .list_permissions(&PermissionFilter::default())
            .await?;

        let mut outcome = GrantAllOutcome {
            total: catalog.len(),
            ..Default::default()
        };

        for permission in &catalog {
            let request = GrantRequest {
                user_id: user_id.clone(),
                permission_id: Some(permission.id.clone()),
                process_id: process_id.clone(),
                stage_id: None,
                expires_at: None,
                granted_by: granted_by.clone(),
            };
            match self.grant(&request).await {
                Ok(_) => outcome.granted += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        permission = %permission.key(),
                        process_id = %process_id,
                        error = %e,
                        "grant-all item failed"
                    );
                    outcome.failed += 1;
                    outcome.errors.push(GrantFailure {
                        permission_id: permission.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            user_id = %user_id,
            process_id = %process_id,
            granted = outcome.granted,
            failed = outcome.failed,
            "granted full catalog"
        );
        Ok(outcome)
    }

    /// Delete every grant row (any permission, any stage) of `user_id` in `process_id`.
    /// Deleting nothing is not an error.
    pub async fn revoke_all_for_process(
        &self,
        process_id: &ProcessId,
        user_id: &UserId,
    ) -> Result<RevokeAllOutcome, AuthzError> {
        let deleted_count = self
            .ports
            .grants
            .delete_grants_for_process(process_id, user_id)
            .await?;

        tracing::info!(
            user_id = %user_id,
            process_id = %process_id,
            deleted_count,
            "revoked all grants in process"
        );
        Ok(RevokeAllOutcome { deleted_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_request_accepts_missing_optionals() {
        let json = serde_json::json!({
            "user_id": UserId::new(),
            "process_id": ProcessId::new(),
            "granted_by": UserId::new(),
            "stage_id": StageId::new(),
        });
        let request: GrantRequest = serde_json::from_value(json).unwrap();
        assert!(request.permission_id.is_none());
        assert!(request.stage_id.is_some());
        assert!(request.expires_at.is_none());
    }

    #[test]
    fn test_grant_all_outcome_hides_empty_errors() {
        let outcome = GrantAllOutcome {
            total: 2,
            granted: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["granted"], 2);
    }

    #[test]
    fn test_bulk_item_error_omitted_on_success() {
        let item = BulkGrantItem {
            permission_id: PermissionId::new(),
            success: true,
            error: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("error").is_none());
    }
}
