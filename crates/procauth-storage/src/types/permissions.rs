//! Permission catalog types: the fixed vocabulary of (resource, action) capabilities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PermissionId;

/// Catalog entry. `(resource, action)` is unique across the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub resource: String,
    pub action: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Permission {
    /// `resource:action` form used in logs and diagnostics.
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}

/// Parameters for creating a catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePermissionParams {
    pub resource: String,
    pub action: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Optional filter for catalog listing. Empty filter lists everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionFilter {
    pub resource: Option<String>,
    pub action: Option<String>,
    /// Case-insensitive substring match on name or description
    pub search: Option<String>,
}

impl PermissionFilter {
    pub fn resource(resource: impl Into<String>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, permission: &Permission) -> bool {
        if let Some(resource) = &self.resource {
            if &permission.resource != resource {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if &permission.action != action {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let in_name = permission.name.to_lowercase().contains(&needle);
            let in_description = permission
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}
