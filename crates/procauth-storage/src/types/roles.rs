//! Role types: named, globally scoped bundles of catalog permissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RoleId;

/// Role record. A user holds at most one role; there is no inheritance between roles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    /// System roles keep their name and can never be deactivated.
    pub is_system_role: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a role
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRoleParams {
    pub name: String,
    pub description: Option<String>,
    pub is_system_role: bool,
}

/// Partial update of a role; `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpdateRoleParams {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl UpdateRoleParams {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.is_active.is_none()
    }
}
