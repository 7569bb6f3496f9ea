use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::tokens::{fingerprint, TokenPair};
use crate::authz::{Permission, Principal, Role};
use crate::errors::AppError;
use crate::jwt::peek_claims;

const UNKNOWN_IDENTITY: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExchangeError {
    /// The server refused the credential (expired, revoked, wrong password).
    #[error("credential rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("refresh token not found")]
    MissingRefreshToken,
    #[error("network error: {0}")]
    Transport(String),
    #[error("server error ({0})")]
    Server(u16),
    #[error("invalid exchange payload: {0}")]
    InvalidPayload(String),
}

impl ExchangeError {
    /// Auth-class failures end the session; everything else is retryable.
    pub fn is_auth_class(&self) -> bool {
        matches!(self, ExchangeError::Rejected { .. } | ExchangeError::MissingRefreshToken)
    }
}

/// Body returned by the refresh, login and register endpoints.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangePayload {
    pub access_token: String,
    pub refresh_token: String,
    pub role: String,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl std::fmt::Debug for ExchangePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangePayload")
            .field("access_token", &fingerprint(&self.access_token))
            .field("refresh_token", &fingerprint(&self.refresh_token))
            .field("role", &self.role)
            .field("organization_id", &self.organization_id)
            .field("permissions", &self.permissions)
            .field("id", &self.id)
            .field("email", &self.email)
            .finish()
    }
}

impl ExchangePayload {
    /// Normalize the wire payload into a token pair and a principal.
    ///
    /// The role string is converted exactly once here; unknown roles are an
    /// error. Unknown permission strings are dropped.
    pub fn into_session(self) -> Result<(TokenPair, Principal), ExchangeError> {
        let role: Role = self
            .role
            .parse()
            .map_err(|err: crate::authz::ParseRoleError| ExchangeError::InvalidPayload(err.to_string()))?;

        let claims = if self.id.is_none() || self.email.is_none() {
            match peek_claims(&self.access_token) {
                Ok(claims) => claims,
                Err(err) => {
                    tracing::debug!(error = %err, "access token carries no readable claims");
                    Default::default()
                }
            }
        } else {
            Default::default()
        };

        let id = self.id.or(claims.sub).unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());
        let email = self.email.or(claims.email).unwrap_or_else(|| UNKNOWN_IDENTITY.to_string());

        let mut principal = Principal::new(id, email, role);
        if let Some(organization_id) = self.organization_id {
            principal = principal.with_organization(organization_id);
        }
        if let Some(names) = self.permissions {
            principal = principal.with_permissions(parse_permissions(&names));
        }

        Ok((TokenPair::new(self.access_token, self.refresh_token), principal))
    }
}

fn parse_permissions(names: &[String]) -> Vec<Permission> {
    names
        .iter()
        .filter_map(|name| match name.parse::<Permission>() {
            Ok(perm) => Some(perm),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring permission outside the catalog");
                None
            }
        })
        .collect()
}

pub fn decode_payload(bytes: &[u8]) -> Result<ExchangePayload, ExchangeError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(de)
        .map_err(|err| ExchangeError::InvalidPayload(format!("{} at {}", err.inner(), err.path())))
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// The backend's credential endpoints.
#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<ExchangePayload, ExchangeError>;
    async fn login(&self, request: &LoginRequest) -> Result<ExchangePayload, ExchangeError>;
    async fn register(&self, request: &RegisterRequest) -> Result<ExchangePayload, ExchangeError>;
}

/// reqwest-backed client for `{base}/auth/*`.
#[derive(Debug, Clone)]
pub struct HttpCredentialExchange {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCredentialExchange {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::configuration(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, bearer: Option<&str>, body: &B) -> Result<ExchangePayload, ExchangeError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| {
            tracing::warn!(url = %url, error = %err, "credential exchange unreachable");
            ExchangeError::Transport(err.to_string())
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ExchangeError::Rejected {
                status: status.as_u16(),
                message: server_message(&body).unwrap_or_else(|| "session expired".to_string()),
            });
        }
        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "credential exchange failed");
            return Err(ExchangeError::Server(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ExchangeError::Transport(err.to_string()))?;
        decode_payload(&body)
    }
}

/// Backends put a human-readable reason under `message`.
fn server_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl CredentialExchange for HttpCredentialExchange {
    async fn refresh(&self, access_token: &str, refresh_token: &str) -> Result<ExchangePayload, ExchangeError> {
        self.post("/auth/refresh", Some(access_token), &RefreshRequest { refresh_token }).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<ExchangePayload, ExchangeError> {
        self.post("/auth/login", None, request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<ExchangePayload, ExchangeError> {
        self.post("/auth/register", None, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::permissions_for;

    #[test]
    fn payload_without_permissions_derives_from_role() {
        let payload = decode_payload(
            br#"{"accessToken":"a","refreshToken":"r","role":"org_admin","organizationId":"org-9","id":"u-1","email":"x@example.com"}"#,
        )
        .unwrap();
        let (pair, principal) = payload.into_session().unwrap();

        assert_eq!(pair, TokenPair::new("a", "r"));
        assert_eq!(principal.role, Role::OrgAdmin);
        assert_eq!(principal.permissions, permissions_for(Role::OrgAdmin));
        assert_eq!(principal.organization_id.as_deref(), Some("org-9"));
    }

    #[test]
    fn explicit_permissions_override_and_unknown_ones_are_dropped() {
        let payload = decode_payload(
            br#"{"accessToken":"a","refreshToken":"r","role":"STUDENT","permissions":["report:view","galaxy:destroy"]}"#,
        )
        .unwrap();
        let (_, principal) = payload.into_session().unwrap();

        assert_eq!(principal.permissions.len(), 1);
        assert!(principal.has_permission(Permission::ReportView));
        assert_eq!(principal.id, "unknown");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let payload = decode_payload(br#"{"accessToken":"a","refreshToken":"r","role":"wizard"}"#).unwrap();
        assert!(matches!(payload.into_session(), Err(ExchangeError::InvalidPayload(_))));
    }

    #[test]
    fn decode_errors_name_the_field() {
        let err = decode_payload(br#"{"accessToken":"a","refreshToken":7,"role":"TUTOR"}"#).unwrap_err();
        match err {
            ExchangeError::InvalidPayload(message) => assert!(message.contains("refreshToken"), "{message}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn error_classes() {
        assert!(ExchangeError::MissingRefreshToken.is_auth_class());
        assert!(ExchangeError::Rejected { status: 401, message: String::new() }.is_auth_class());
        assert!(!ExchangeError::Transport("timeout".into()).is_auth_class());
        assert!(!ExchangeError::Server(502).is_auth_class());
        assert!(!ExchangeError::InvalidPayload("x".into()).is_auth_class());
    }

    #[test]
    fn server_message_is_extracted() {
        assert_eq!(server_message(br#"{"message":"Refresh token expired"}"#).as_deref(), Some("Refresh token expired"));
        assert_eq!(server_message(b"<html>"), None);
    }
}
