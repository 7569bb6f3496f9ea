use serde::{Deserialize, Serialize};

use super::catalog::{Permission, PermissionSet, Role};
use super::role_map::permissions_for;

/// The authenticated identity together with its resolved permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub organization_id: Option<String>,
    pub permissions: PermissionSet,
}

impl Principal {
    /// Principal with the role's baseline permissions.
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
            organization_id: None,
            permissions: permissions_for(role),
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Replace the derived set with an explicit backend-supplied one.
    pub fn with_permissions(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions = perms.into_iter().collect();
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    pub fn summary(&self) -> PrincipalSummary {
        PrincipalSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Identity fields only, for audit records and logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalSummary {
    pub id: String,
    pub email: String,
    pub role: Role,
}
