use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

/// Coarse-grained identity category. A principal carries exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    OrgAdmin,
    Tutor,
    Student,
    Guest,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::OrgAdmin,
        Role::Tutor,
        Role::Student,
        Role::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::OrgAdmin => "ORG_ADMIN",
            Role::Tutor => "TUTOR",
            Role::Student => "STUDENT",
            Role::Guest => "GUEST",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized role: {0:?}")]
pub struct ParseRoleError(pub String);

/// Case-insensitive: the backend is inconsistent about casing (`student`,
/// `Student`, `STUDENT`). Anything outside the closed set is rejected.
impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| ParseRoleError(value.to_string()))
    }
}

/// Fine-grained capability tag, `<domain>:<action>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter)]
pub enum Permission {
    // User
    #[serde(rename = "user:create")]
    UserCreate,
    #[serde(rename = "user:read")]
    UserRead,
    #[serde(rename = "user:update")]
    UserUpdate,
    #[serde(rename = "user:delete")]
    UserDelete,

    // Course
    #[serde(rename = "course:create")]
    CourseCreate,
    #[serde(rename = "course:publish")]
    CoursePublish,
    #[serde(rename = "course:view")]
    CourseView,
    #[serde(rename = "course:enroll")]
    CourseEnroll,

    // Organization
    #[serde(rename = "org:create")]
    OrgCreate,
    #[serde(rename = "org:manage")]
    OrgManage,

    // Reports
    #[serde(rename = "report:view")]
    ReportView,
    #[serde(rename = "report:export")]
    ReportExport,

    // Settings
    #[serde(rename = "settings:view")]
    SettingsView,
    #[serde(rename = "settings:update")]
    SettingsUpdate,
}

impl Permission {
    /// Every variant, in declaration order. `role_map` derives the super
    /// admin grant from this.
    pub fn all() -> impl Iterator<Item = Permission> {
        Permission::iter()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UserCreate => "user:create",
            Permission::UserRead => "user:read",
            Permission::UserUpdate => "user:update",
            Permission::UserDelete => "user:delete",
            Permission::CourseCreate => "course:create",
            Permission::CoursePublish => "course:publish",
            Permission::CourseView => "course:view",
            Permission::CourseEnroll => "course:enroll",
            Permission::OrgCreate => "org:create",
            Permission::OrgManage => "org:manage",
            Permission::ReportView => "report:view",
            Permission::ReportExport => "report:export",
            Permission::SettingsView => "settings:view",
            Permission::SettingsUpdate => "settings:update",
        }
    }

    pub fn domain(&self) -> &'static str {
        self.as_str().split_once(':').map(|(domain, _)| domain).unwrap_or_default()
    }

    pub fn action(&self) -> &'static str {
        self.as_str().split_once(':').map(|(_, action)| action).unwrap_or_default()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized permission: {0:?}")]
pub struct ParsePermissionError(pub String);

impl FromStr for Permission {
    type Err = ParsePermissionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Permission::all()
            .find(|perm| perm.as_str() == trimmed)
            .ok_or_else(|| ParsePermissionError(value.to_string()))
    }
}

pub type PermissionSet = BTreeSet<Permission>;

pub fn full_catalog() -> PermissionSet {
    Permission::all().collect()
}
