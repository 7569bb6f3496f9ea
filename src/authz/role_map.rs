use super::catalog::{full_catalog, Permission, PermissionSet, Role};

const ORG_ADMIN: &[Permission] = &[
    Permission::UserCreate,
    Permission::UserRead,
    Permission::UserUpdate,
    Permission::UserDelete,
    Permission::CourseCreate,
    Permission::CoursePublish,
    Permission::CourseView,
    Permission::ReportView,
    Permission::ReportExport,
    Permission::SettingsView,
    Permission::SettingsUpdate,
];

const TUTOR: &[Permission] = &[
    Permission::CourseCreate,
    Permission::CourseView,
    Permission::ReportView,
    Permission::SettingsView,
];

const STUDENT: &[Permission] = &[
    Permission::CourseView,
    Permission::CourseEnroll,
    Permission::SettingsView,
];

/// Baseline permission set for a role.
///
/// `SuperAdmin` is derived from the catalog rather than enumerated, so new
/// permissions reach it without touching this map.
pub fn permissions_for(role: Role) -> PermissionSet {
    match role {
        Role::SuperAdmin => full_catalog(),
        Role::OrgAdmin => ORG_ADMIN.iter().copied().collect(),
        Role::Tutor => TUTOR.iter().copied().collect(),
        Role::Student => STUDENT.iter().copied().collect(),
        Role::Guest => PermissionSet::new(),
    }
}

/// String-keyed lookup. Unrecognized roles get nothing.
pub fn permissions_for_name(role: &str) -> PermissionSet {
    match role.parse::<Role>() {
        Ok(role) => permissions_for(role),
        Err(_) => {
            tracing::debug!(role = %role, "unknown role, no permissions granted");
            PermissionSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn super_admin_holds_full_catalog() {
        assert_eq!(permissions_for(Role::SuperAdmin), full_catalog());
    }

    #[test]
    fn guest_holds_nothing() {
        assert!(permissions_for(Role::Guest).is_empty());
    }

    #[test]
    fn other_roles_hold_strict_non_empty_subsets() {
        let catalog = full_catalog();
        for role in [Role::OrgAdmin, Role::Tutor, Role::Student] {
            let perms = permissions_for(role);
            assert!(!perms.is_empty(), "{role} should hold permissions");
            assert!(perms.is_subset(&catalog));
            assert_ne!(perms, catalog, "{role} should not hold the full catalog");
        }
    }

    #[test]
    fn lookup_is_deterministic() {
        for role in Role::ALL {
            assert_eq!(permissions_for(role), permissions_for(role));
        }
    }

    #[test]
    fn unknown_role_name_fails_closed() {
        assert!(permissions_for_name("root").is_empty());
        assert!(permissions_for_name("").is_empty());
        assert_eq!(permissions_for_name("tutor"), permissions_for(Role::Tutor));
    }

    #[test]
    fn org_admin_cannot_manage_orgs() {
        let perms = permissions_for(Role::OrgAdmin);
        assert!(perms.contains(&Permission::UserRead));
        assert!(!perms.contains(&Permission::OrgManage));
        assert!(!perms.contains(&Permission::CourseEnroll));
    }
}
