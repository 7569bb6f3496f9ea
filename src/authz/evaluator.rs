use super::catalog::{Permission, PermissionSet, Role};
use crate::navigation::RouteDescriptor;

/// Pluggable route access decision.
pub trait AccessEvaluator: Send + Sync {
    fn can_access(&self, route: &RouteDescriptor, role: Option<Role>, permissions: Option<&PermissionSet>) -> bool;
}

/// Standard evaluation order:
/// 1. public route -> allow
/// 2. no role (unauthenticated) -> deny
/// 3. role not among required roles -> deny
/// 4. any required permission missing -> deny
/// 5. allow
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAccessEvaluator;

impl DefaultAccessEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl AccessEvaluator for DefaultAccessEvaluator {
    fn can_access(&self, route: &RouteDescriptor, role: Option<Role>, permissions: Option<&PermissionSet>) -> bool {
        can_access(route, role, permissions)
    }
}

pub fn can_access(route: &RouteDescriptor, role: Option<Role>, permissions: Option<&PermissionSet>) -> bool {
    // 1. Public routes are open to everyone
    if route.is_public {
        return true;
    }

    // 2. Protected routes need an authenticated role
    let Some(role) = role else {
        tracing::debug!(route = %route.path, "no principal, access denied");
        return false;
    };

    // 3. Role requirement
    if !route.required_roles.is_empty() && !route.required_roles.contains(&role) {
        tracing::debug!(route = %route.path, role = %role, "role not permitted");
        return false;
    }

    // 4. Permission requirement (all of them); a missing set counts as empty
    if !route.required_permissions.is_empty() {
        let empty = PermissionSet::new();
        let held = permissions.unwrap_or(&empty);
        if !has_permissions(held, &route.required_permissions) {
            tracing::debug!(route = %route.path, role = %role, "missing required permission");
            return false;
        }
    }

    true
}

/// True iff every required permission is held.
pub fn has_permissions(held: &PermissionSet, required: &[Permission]) -> bool {
    required.iter().all(|perm| held.contains(perm))
}

pub fn has_any_role(role: Option<Role>, required: &[Role]) -> bool {
    role.is_some_and(|role| required.contains(&role))
}

/// Action-level check used outside of routing (buttons, menu entries).
/// Each requirement is skipped when absent; both must hold when present.
pub fn can_perform_action(
    role: Option<Role>,
    held: &PermissionSet,
    required_roles: Option<&[Role]>,
    required_permissions: Option<&[Permission]>,
) -> bool {
    if let Some(roles) = required_roles {
        if !has_any_role(role, roles) {
            return false;
        }
    }

    if let Some(perms) = required_permissions {
        if !has_permissions(held, perms) {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::permissions_for;

    fn admin_users_route() -> RouteDescriptor {
        RouteDescriptor::new("/dashboard/users", "User Management")
            .with_roles([Role::OrgAdmin, Role::SuperAdmin])
            .with_permissions([Permission::UserRead])
    }

    #[test]
    fn public_route_is_open_to_anonymous() {
        let route = RouteDescriptor::new("/", "Home").public();
        assert!(can_access(&route, None, None));
        assert!(can_access(&route, Some(Role::Guest), Some(&PermissionSet::new())));
    }

    #[test]
    fn protected_route_denies_anonymous() {
        let route = RouteDescriptor::new("/dashboard/personal-settings", "Settings");
        assert!(!can_access(&route, None, None));
    }

    #[test]
    fn route_without_requirements_admits_any_role() {
        let route = RouteDescriptor::new("/dashboard/personal-settings", "Settings");
        for role in Role::ALL {
            assert!(can_access(&route, Some(role), None));
        }
    }

    #[test]
    fn student_cannot_reach_admin_route() {
        let perms = permissions_for(Role::Student);
        assert!(!can_access(&admin_users_route(), Some(Role::Student), Some(&perms)));
    }

    #[test]
    fn org_admin_with_user_read_can_reach_admin_route() {
        let perms = permissions_for(Role::OrgAdmin);
        assert!(can_access(&admin_users_route(), Some(Role::OrgAdmin), Some(&perms)));
    }

    #[test]
    fn role_match_without_permission_is_denied() {
        let perms: PermissionSet = [Permission::SettingsView].into_iter().collect();
        assert!(!can_access(&admin_users_route(), Some(Role::OrgAdmin), Some(&perms)));
        assert!(!can_access(&admin_users_route(), Some(Role::OrgAdmin), None));
    }

    #[test]
    fn partial_permission_coverage_is_denied() {
        let route = RouteDescriptor::new("/dashboard/courses", "Course Management")
            .with_permissions([Permission::CourseCreate, Permission::CourseView]);
        let partial: PermissionSet = [Permission::CourseCreate].into_iter().collect();
        let full: PermissionSet = [Permission::CourseCreate, Permission::CourseView].into_iter().collect();
        assert!(!can_access(&route, Some(Role::Tutor), Some(&partial)));
        assert!(can_access(&route, Some(Role::Tutor), Some(&full)));
    }

    #[test]
    fn action_checks_skip_absent_requirements() {
        let held = permissions_for(Role::Tutor);
        assert!(can_perform_action(Some(Role::Tutor), &held, None, None));
        assert!(can_perform_action(Some(Role::Tutor), &held, Some(&[Role::Tutor]), Some(&[Permission::CourseCreate])));
        assert!(!can_perform_action(Some(Role::Tutor), &held, Some(&[Role::Student]), None));
        assert!(!can_perform_action(None, &held, Some(&[Role::Tutor]), None));
        assert!(!can_perform_action(Some(Role::Tutor), &held, None, Some(&[Permission::UserDelete])));
    }

    #[test]
    fn trait_object_delegates() {
        let evaluator: Box<dyn AccessEvaluator> = Box::new(DefaultAccessEvaluator::new());
        let perms = permissions_for(Role::SuperAdmin);
        assert!(evaluator.can_access(&admin_users_route(), Some(Role::SuperAdmin), Some(&perms)));
    }
}
