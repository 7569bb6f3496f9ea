use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::guard::Navigation;
use crate::navigation::{navigation_menu, RouteDescriptor};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NavigateQuery {
    /// Requested client path, e.g. `/dashboard/users`
    pub path: String,
    /// `false` reports the current state without resolving the session
    pub resolve: Option<bool>,
}

#[utoipa::path(
    get,
    path = "/api/navigate",
    tag = "Navigation",
    params(NavigateQuery),
    responses(
        (status = 200, description = "Guard state and render decision"),
        (status = 400, description = "Path is not absolute")
    )
)]
pub async fn navigate(State(state): State<AppState>, Query(query): Query<NavigateQuery>) -> AppResult<Json<Navigation>> {
    if !query.path.starts_with('/') {
        return Err(AppError::bad_request("path must start with '/'"));
    }

    let navigation = if query.resolve.unwrap_or(true) {
        state.guard.navigate(&state.session, &query.path).await
    } else {
        let snapshot = state.session.snapshot().await;
        state.guard.observe(&snapshot, &query.path)
    };

    Ok(Json(navigation))
}

#[utoipa::path(
    get,
    path = "/api/navigation/menu",
    tag = "Navigation",
    responses((status = 200, description = "Menu entries visible to the current principal"))
)]
pub async fn menu(State(state): State<AppState>) -> AppResult<Json<Vec<RouteDescriptor>>> {
    let principal = state.session.principal().await;
    let role = principal.as_ref().map(|principal| principal.role);
    let permissions = principal.as_ref().map(|principal| &principal.permissions);

    Ok(Json(navigation_menu(state.guard.table().routes(), role, permissions)))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RouteSummary {
    #[schema(example = "/dashboard/users")]
    pub path: String,
    #[schema(example = "User Management")]
    pub name: String,
    pub public: bool,
    #[schema(example = json!(["ORG_ADMIN", "SUPER_ADMIN"]))]
    pub required_roles: Vec<String>,
    #[schema(example = json!(["user:read"]))]
    pub required_permissions: Vec<String>,
    pub show_in_nav: bool,
}

#[utoipa::path(
    get,
    path = "/api/navigation/routes",
    tag = "Navigation",
    responses((status = 200, description = "Every route with its full path", body = [RouteSummary]))
)]
pub async fn routes(State(state): State<AppState>) -> AppResult<Json<Vec<RouteSummary>>> {
    let summaries = state
        .guard
        .table()
        .flatten()
        .into_iter()
        .map(|(path, route)| RouteSummary {
            path,
            name: route.name.clone(),
            public: route.is_public,
            required_roles: route.required_roles.iter().map(|role| role.as_str().to_string()).collect(),
            required_permissions: route.required_permissions.iter().map(|perm| perm.as_str().to_string()).collect(),
            show_in_nav: route.show_in_nav,
        })
        .collect();

    Ok(Json(summaries))
}
