use std::collections::HashSet;

use super::{Layout, RouteDescriptor, View};
use crate::authz::{Permission, Role};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteTableError {
    #[error("public route {0} must not declare required roles or permissions")]
    PublicWithRequirements(String),
    #[error("duplicate route path {0}")]
    DuplicatePath(String),
    #[error("route {0} has an empty parameter segment")]
    EmptyParameter(String),
}

/// Validated tree of route descriptors.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDescriptor>) -> Result<Self, RouteTableError> {
        let mut seen = HashSet::new();
        for route in &routes {
            validate(route, "", &mut seen)?;
        }
        Ok(Self { routes })
    }

    /// The portal's compiled-in table.
    pub fn builtin() -> Result<Self, RouteTableError> {
        Self::new(default_routes())
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    /// Every route paired with its full path, depth-first in declaration order.
    pub fn flatten(&self) -> Vec<(String, &RouteDescriptor)> {
        fn walk<'a>(routes: &'a [RouteDescriptor], parent: &str, out: &mut Vec<(String, &'a RouteDescriptor)>) {
            for route in routes {
                let full = join_path(parent, &route.path);
                out.push((full.clone(), route));
                walk(&route.children, &full, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.routes, "", &mut out);
        out
    }
}

fn validate(route: &RouteDescriptor, parent: &str, seen: &mut HashSet<String>) -> Result<(), RouteTableError> {
    let full = join_path(parent, &route.path);

    if route.is_public && route.has_requirements() {
        return Err(RouteTableError::PublicWithRequirements(full));
    }
    if full.split('/').any(|segment| segment == ":") {
        return Err(RouteTableError::EmptyParameter(full));
    }
    if !seen.insert(full.clone()) {
        return Err(RouteTableError::DuplicatePath(full));
    }

    for child in &route.children {
        validate(child, &full, seen)?;
    }
    Ok(())
}

/// Absolute child paths replace the parent prefix; relative ones extend it.
pub(crate) fn join_path(parent: &str, path: &str) -> String {
    if path.starts_with('/') || parent.is_empty() {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            return "/".to_string();
        }
        return if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };
    }

    let base = parent.trim_end_matches('/');
    let child = path.trim_matches('/');
    if child.is_empty() {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }
    format!("{base}/{child}")
}

pub fn default_routes() -> Vec<RouteDescriptor> {
    let course_staff = [Role::OrgAdmin, Role::SuperAdmin, Role::Tutor];

    vec![
        // Public
        RouteDescriptor::new("/", "Home").view(View::Landing).public(),
        RouteDescriptor::new("/login", "Login")
            .view(View::Login)
            .layout(Layout::Auth)
            .guest_only(),
        RouteDescriptor::new("/register", "Register")
            .view(View::Register)
            .layout(Layout::Auth)
            .guest_only(),
        RouteDescriptor::new("/unauthorized", "Unauthorized")
            .view(View::Unauthorized)
            .public(),
        // Any authenticated principal
        RouteDescriptor::new("/dashboard", "Dashboard").dashboard_redirect(),
        RouteDescriptor::new("/dashboard/personal-settings", "Personal Settings")
            .view(View::Profile)
            .layout(Layout::Dashboard),
        // Super admin
        RouteDescriptor::new("/dashboard/super-admin", "Super Admin")
            .view(View::DashboardHome)
            .layout(Layout::Dashboard)
            .with_roles([Role::SuperAdmin])
            .in_nav("shield")
            .with_children([RouteDescriptor::new("orgs", "Organizations")
                .view(View::DashboardHome)
                .layout(Layout::Dashboard)
                .with_permissions([Permission::OrgManage])
                .in_nav("business")]),
        // Organization admin
        RouteDescriptor::new("/dashboard/admin", "Dashboard")
            .view(View::DashboardHome)
            .layout(Layout::Dashboard)
            .with_roles([Role::OrgAdmin, Role::SuperAdmin])
            .in_nav("dashboard"),
        RouteDescriptor::new("/dashboard/users", "User Management")
            .view(View::DashboardUsers)
            .layout(Layout::Dashboard)
            .with_roles([Role::OrgAdmin, Role::SuperAdmin])
            .with_permissions([Permission::UserRead])
            .in_nav("people"),
        RouteDescriptor::new("/dashboard/courses", "Course Management")
            .view(View::CourseManagement)
            .layout(Layout::Dashboard)
            .with_roles(course_staff)
            .with_permissions([Permission::CourseCreate, Permission::CourseView])
            .in_nav("menu_book")
            .with_children([
                RouteDescriptor::new("create", "Create Course")
                    .view(View::CourseCreate)
                    .layout(Layout::Dashboard)
                    .with_roles(course_staff)
                    .with_permissions([Permission::CourseCreate]),
                RouteDescriptor::new(":id", "Course Detail")
                    .view(View::CourseDetail)
                    .layout(Layout::Dashboard)
                    .with_roles(course_staff)
                    .with_permissions([Permission::CourseView]),
            ]),
        // Tutor
        RouteDescriptor::new("/dashboard/tutor", "Tutor Dashboard")
            .view(View::DashboardHome)
            .layout(Layout::Dashboard)
            .with_roles([Role::Tutor])
            .in_nav("school")
            .with_children([RouteDescriptor::new("learn", "My Courses")
                .view(View::DashboardLearn)
                .layout(Layout::Dashboard)
                .with_permissions([Permission::CourseCreate])
                .in_nav("menu_book")]),
        // Student
        RouteDescriptor::new("/dashboard/student", "Student Dashboard")
            .view(View::DashboardHome)
            .layout(Layout::Dashboard)
            .with_roles([Role::Student])
            .in_nav("person")
            .with_children([
                RouteDescriptor::new("learn", "My Learning")
                    .view(View::DashboardLearn)
                    .layout(Layout::Dashboard)
                    .with_permissions([Permission::CourseView])
                    .in_nav("auto_stories"),
                RouteDescriptor::new("learn/course/:courseId/lesson/:lessonId", "Course Player")
                    .view(View::CoursePlayer)
                    .layout(Layout::Dashboard)
                    .with_permissions([Permission::CourseView]),
            ]),
    ]
}
