//! Route descriptor table: static declarations of navigable paths and
//! their access requirements, plus matching and menu derivation.

mod matching;
mod menu;
mod table;

pub use matching::RouteMatch;
pub use menu::{accessible_routes, dashboard_path_for, navigation_menu, post_login_destination};
pub use table::{default_routes, RouteTable, RouteTableError};

use serde::Serialize;

use crate::authz::{Permission, Role};

/// Page layout wrapping a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Default,
    Auth,
    Dashboard,
}

/// Compile-time registry of renderable views. A render decision names one of
/// these and the renderer maps it to a concrete page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Landing,
    Login,
    Register,
    Unauthorized,
    NotFound,
    Profile,
    DashboardHome,
    DashboardLearn,
    DashboardUsers,
    CourseManagement,
    CourseCreate,
    CourseDetail,
    CoursePlayer,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Landing => "landing",
            View::Login => "login",
            View::Register => "register",
            View::Unauthorized => "unauthorized",
            View::NotFound => "not-found",
            View::Profile => "profile",
            View::DashboardHome => "dashboard-home",
            View::DashboardLearn => "dashboard-learn",
            View::DashboardUsers => "dashboard-users",
            View::CourseManagement => "course-management",
            View::CourseCreate => "course-create",
            View::CourseDetail => "course-detail",
            View::CoursePlayer => "course-player",
        }
    }
}

/// A navigable path and what it takes to reach it.
///
/// Top-level paths are absolute; child paths are relative to their parent.
/// Children inherit nothing: only the matched route's own requirements apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDescriptor {
    pub path: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<View>,
    pub layout: Layout,
    pub required_roles: Vec<Role>,
    pub required_permissions: Vec<Permission>,
    pub is_public: bool,
    /// Login/register style pages: an authenticated principal is sent to its dashboard.
    pub guest_only: bool,
    /// Resolves to the principal's role dashboard instead of rendering.
    pub dashboard_redirect: bool,
    pub show_in_nav: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RouteDescriptor>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            view: None,
            layout: Layout::Default,
            required_roles: Vec::new(),
            required_permissions: Vec::new(),
            is_public: false,
            guest_only: false,
            dashboard_redirect: false,
            show_in_nav: false,
            icon: None,
            children: Vec::new(),
        }
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }

    pub fn with_permissions(mut self, perms: impl IntoIterator<Item = Permission>) -> Self {
        self.required_permissions = perms.into_iter().collect();
        self
    }

    pub fn public(mut self) -> Self {
        self.is_public = true;
        self
    }

    pub fn guest_only(mut self) -> Self {
        self.is_public = true;
        self.guest_only = true;
        self
    }

    pub fn dashboard_redirect(mut self) -> Self {
        self.dashboard_redirect = true;
        self
    }

    pub fn in_nav(mut self, icon: &str) -> Self {
        self.show_in_nav = true;
        self.icon = Some(icon.to_string());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RouteDescriptor>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    pub fn has_requirements(&self) -> bool {
        !self.required_roles.is_empty() || !self.required_permissions.is_empty()
    }
}
