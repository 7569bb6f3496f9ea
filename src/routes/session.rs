use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::{can_perform_action, Permission, Principal, Role};
use crate::errors::{AppError, AppResult};
use crate::navigation::{dashboard_path_for, post_login_destination};
use crate::session::{BootstrapResult, LoginRequest, RegisterRequest};

#[derive(Debug, Serialize, ToSchema)]
pub struct PrincipalResponse {
    #[schema(example = "6f1c2a9e-3b4d-4e8f-9a01-2b3c4d5e6f70")]
    pub id: String,
    #[schema(example = "tutor@example.com")]
    pub email: String,
    #[schema(example = "TUTOR")]
    pub role: String,
    pub organization_id: Option<String>,
    #[schema(example = json!(["course:create", "course:view"]))]
    pub permissions: Vec<String>,
    /// Landing dashboard for the role
    #[schema(example = "/dashboard/tutor")]
    pub dashboard: String,
}

impl From<&Principal> for PrincipalResponse {
    fn from(principal: &Principal) -> Self {
        Self {
            id: principal.id.clone(),
            email: principal.email.clone(),
            role: principal.role.as_str().to_string(),
            organization_id: principal.organization_id.clone(),
            permissions: principal.permissions.iter().map(|perm| perm.as_str().to_string()).collect(),
            dashboard: dashboard_path_for(Some(principal.role)).to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInResponse {
    pub principal: PrincipalResponse,
    /// Where the shell should navigate next
    #[schema(example = "/dashboard/tutor")]
    pub redirect_to: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "logged out")]
    pub message: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginBody {
    #[schema(example = "tutor@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
    /// Path the user originally asked for, as captured by a login redirect
    #[schema(example = "/dashboard/courses")]
    pub from: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterBody {
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

/// Action-level check for controls inside a page (buttons, menu actions).
#[derive(Debug, Deserialize, ToSchema)]
pub struct AuthorizeBody {
    /// Any one of these roles; omitted means no role requirement
    #[schema(example = json!(["ORG_ADMIN", "SUPER_ADMIN"]))]
    pub roles: Option<Vec<String>>,
    /// Every one of these permissions; omitted means no permission requirement
    #[schema(example = json!(["user:delete"]))]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizeResponse {
    pub allowed: bool,
}

#[utoipa::path(
    get,
    path = "/api/session",
    tag = "Session",
    responses(
        (status = 200, description = "Current principal", body = PrincipalResponse),
        (status = 401, description = "No resolved principal")
    )
)]
pub async fn current(State(state): State<AppState>) -> AppResult<Json<PrincipalResponse>> {
    let principal = state
        .session
        .principal()
        .await
        .ok_or_else(|| AppError::unauthenticated("no active session"))?;

    Ok(Json(PrincipalResponse::from(&principal)))
}

#[utoipa::path(
    post,
    path = "/api/session/login",
    tag = "Session",
    request_body = LoginBody,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 503, description = "Credential service unreachable")
    )
)]
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> AppResult<Json<SignInResponse>> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("email and password are required"));
    }

    let request = LoginRequest {
        email: body.email.trim().to_string(),
        password: body.password,
    };
    let principal = state.session.login(&request).await?;
    let redirect_to = post_login_destination(state.guard.table(), &principal, body.from.as_deref());

    Ok(Json(SignInResponse {
        principal: PrincipalResponse::from(&principal),
        redirect_to,
    }))
}

#[utoipa::path(
    post,
    path = "/api/session/register",
    tag = "Session",
    request_body = RegisterBody,
    responses(
        (status = 200, description = "Account created and signed in", body = SignInResponse),
        (status = 400, description = "Missing fields"),
        (status = 503, description = "Credential service unreachable")
    )
)]
pub async fn register(State(state): State<AppState>, Json(body): Json<RegisterBody>) -> AppResult<Json<SignInResponse>> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("name, email and password are required"));
    }

    let request = RegisterRequest {
        name: body.name.trim().to_string(),
        email: body.email.trim().to_string(),
        password: body.password,
    };
    let principal = state.session.register(&request).await?;
    let redirect_to = post_login_destination(state.guard.table(), &principal, None);

    Ok(Json(SignInResponse {
        principal: PrincipalResponse::from(&principal),
        redirect_to,
    }))
}

#[utoipa::path(
    post,
    path = "/api/session/refresh",
    tag = "Session",
    responses(
        (status = 200, description = "Session re-validated", body = PrincipalResponse),
        (status = 401, description = "No credential, or the credential was rejected"),
        (status = 503, description = "Credential service unreachable; tokens kept")
    )
)]
pub async fn refresh(State(state): State<AppState>) -> AppResult<Json<PrincipalResponse>> {
    match state.session.on_focus().await {
        BootstrapResult::Resolved(principal) => Ok(Json(PrincipalResponse::from(&principal))),
        BootstrapResult::NoCredential => Err(AppError::unauthenticated("no active session")),
        BootstrapResult::AuthError(message) => Err(AppError::session_auth(message)),
        BootstrapResult::TransportError(message) => Err(AppError::session_transport(message)),
    }
}

#[utoipa::path(
    post,
    path = "/api/session/logout",
    tag = "Session",
    responses((status = 200, description = "Tokens cleared", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>) -> AppResult<Json<MessageResponse>> {
    state.session.logout().await?;

    Ok(Json(MessageResponse {
        message: "logged out".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/session/authorize",
    tag = "Session",
    request_body = AuthorizeBody,
    responses(
        (status = 200, description = "Action allowed", body = AuthorizeResponse),
        (status = 400, description = "Unknown role or permission name"),
        (status = 401, description = "No resolved principal"),
        (status = 403, description = "Action not allowed")
    )
)]
pub async fn authorize(State(state): State<AppState>, Json(body): Json<AuthorizeBody>) -> AppResult<Json<AuthorizeResponse>> {
    // unknown names are a 400 with or without a session
    let roles = body
        .roles
        .map(|names| names.iter().map(|name| name.parse::<Role>()).collect::<Result<Vec<_>, _>>())
        .transpose()
        .map_err(|err| AppError::bad_request(err.to_string()))?;
    let permissions = body
        .permissions
        .map(|names| names.iter().map(|name| name.parse::<Permission>()).collect::<Result<Vec<_>, _>>())
        .transpose()
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let principal = state
        .session
        .principal()
        .await
        .ok_or_else(|| AppError::unauthenticated("no active session"))?;

    if !can_perform_action(Some(principal.role), &principal.permissions, roles.as_deref(), permissions.as_deref()) {
        tracing::info!(user_id = %principal.id, role = %principal.role, "action denied");
        return Err(AppError::denied("action not permitted for this session"));
    }

    Ok(Json(AuthorizeResponse { allowed: true }))
}
