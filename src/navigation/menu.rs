use super::{RouteDescriptor, RouteTable};
use crate::authz::{can_access, PermissionSet, Principal, Role};

/// Routes the principal can reach, children filtered recursively.
/// The input is left untouched.
pub fn accessible_routes(routes: &[RouteDescriptor], role: Option<Role>, permissions: Option<&PermissionSet>) -> Vec<RouteDescriptor> {
    routes
        .iter()
        .filter(|route| can_access(route, role, permissions))
        .map(|route| {
            let mut route = route.clone();
            route.children = accessible_routes(&route.children, role, permissions);
            route
        })
        .collect()
}

/// Accessible routes flagged for the navigation menu.
pub fn navigation_menu(routes: &[RouteDescriptor], role: Option<Role>, permissions: Option<&PermissionSet>) -> Vec<RouteDescriptor> {
    fn keep_nav(routes: Vec<RouteDescriptor>) -> Vec<RouteDescriptor> {
        routes
            .into_iter()
            .filter(|route| route.show_in_nav)
            .map(|mut route| {
                route.children = keep_nav(std::mem::take(&mut route.children));
                route
            })
            .collect()
    }

    keep_nav(accessible_routes(routes, role, permissions))
}

pub fn dashboard_path_for(role: Option<Role>) -> &'static str {
    match role {
        Some(Role::SuperAdmin) => "/dashboard/super-admin",
        Some(Role::OrgAdmin) => "/dashboard/admin",
        Some(Role::Tutor) => "/dashboard/tutor",
        Some(Role::Student) => "/dashboard/student",
        Some(Role::Guest) | None => "/dashboard",
    }
}

/// Where to send a principal right after login: the originally requested
/// path when it is a reachable page, otherwise the role dashboard.
pub fn post_login_destination(table: &RouteTable, principal: &Principal, from: Option<&str>) -> String {
    let fallback = dashboard_path_for(Some(principal.role)).to_string();

    let Some(from) = from.filter(|path| is_same_origin_path(path)) else {
        return fallback;
    };

    match table.match_path(from) {
        Some(found)
            if !found.route.guest_only
                && !found.route.dashboard_redirect
                && can_access(found.route, Some(principal.role), Some(&principal.permissions)) =>
        {
            from.to_string()
        }
        _ => fallback,
    }
}

// `//host` and `/\host` are read by browsers as another origin.
fn is_same_origin_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}
