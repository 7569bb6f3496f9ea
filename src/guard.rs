//! Route guard: decides, for one navigation, whether to render the
//! destination, redirect, wait, or offer a session retry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::audit::{AuditRecord, AuditSink};
use crate::authz::{AccessEvaluator, DefaultAccessEvaluator, Principal};
use crate::errors::AppResult;
use crate::navigation::{dashboard_path_for, RouteMatch, RouteTable, View};
use crate::session::{BootstrapResult, SessionContext, SessionSnapshot};

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Guard state for a protected navigation. `Resolving` and `Error` are
/// transient; the other three are terminal for a given navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardState {
    Resolving,
    Error,
    Unauthenticated,
    AuthenticatedAllowed,
    AuthenticatedDenied,
}

impl GuardState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GuardState::Resolving | GuardState::Error)
    }
}

/// What the renderer should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardDecision {
    Loading,
    Render {
        view: Option<View>,
        route: String,
        pattern: String,
        params: BTreeMap<String, String>,
    },
    Redirect {
        location: String,
    },
    /// `from` is handed back to the login page for the post-login redirect.
    RedirectToLogin {
        location: String,
        from: String,
    },
    RedirectToUnauthorized {
        location: String,
    },
    /// Retry re-runs the refresh exchange; the fallback ends the session.
    SessionError {
        message: String,
        retry: bool,
        fallback: SessionFallback,
    },
    NotFound,
}

/// Way out of a session error that does not depend on the credential service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionFallback {
    /// Clear the persisted tokens, then navigate to `then`.
    Logout { then: String },
}

/// Result of one navigation. `state` is `None` for routes the guard does not
/// gate (public pages, unknown paths).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub path: String,
    pub state: Option<GuardState>,
    pub decision: GuardDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditRecord>,
}

pub struct RouteGuard {
    table: Arc<RouteTable>,
    evaluator: Arc<dyn AccessEvaluator>,
    audit: Arc<dyn AuditSink>,
}

impl RouteGuard {
    pub fn new(table: Arc<RouteTable>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            table,
            evaluator: Arc::new(DefaultAccessEvaluator::new()),
            audit,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn AccessEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Drive the guard for `path`: resolve the session first if a token is
    /// persisted but no principal is known, then decide. Never renders a
    /// protected route before that resolution has settled.
    pub async fn navigate(&self, session: &SessionContext, path: &str) -> Navigation {
        let Some(found) = self.table.match_path(path) else {
            return self.not_found(path);
        };

        if found.route.is_public && !found.route.guest_only {
            return self.render(path, None, &found);
        }

        match session.ensure_resolved().await {
            BootstrapResult::Resolved(principal) => self.authorize(path, &found, &principal),
            BootstrapResult::NoCredential | BootstrapResult::AuthError(_) => self.unauthenticated(path, &found),
            BootstrapResult::TransportError(message) => self.session_error(path, message),
        }
    }

    /// Decide for an already known principal, auditing a denial the same
    /// way `navigate` does.
    pub fn decide_for(&self, principal: &Principal, path: &str) -> Navigation {
        let Some(found) = self.table.match_path(path) else {
            return self.not_found(path);
        };

        if found.route.is_public && !found.route.guest_only {
            return self.render(path, None, &found);
        }

        self.authorize(path, &found, principal)
    }

    /// Take the `SessionError` fallback: end the session, then navigate to
    /// its landing page.
    pub async fn fall_back(&self, session: &SessionContext) -> AppResult<Navigation> {
        session.logout().await?;
        tracing::info!("session error fallback taken, tokens cleared");
        Ok(self.navigate(session, LOGIN_PATH).await)
    }

    /// Decide from a snapshot without any I/O. A session that still has to
    /// be resolved yields `Loading`; nothing is audited.
    pub fn observe(&self, snapshot: &SessionSnapshot, path: &str) -> Navigation {
        let Some(found) = self.table.match_path(path) else {
            return self.not_found(path);
        };

        if found.route.is_public && !found.route.guest_only {
            return self.render(path, None, &found);
        }

        match (&snapshot.principal, snapshot.has_token) {
            (Some(principal), _) => {
                let allowed = self.evaluator.can_access(found.route, Some(principal.role), Some(&principal.permissions));
                if found.route.guest_only || allowed {
                    self.allowed(path, &found, principal)
                } else {
                    Navigation {
                        path: path.to_string(),
                        state: Some(GuardState::AuthenticatedDenied),
                        decision: GuardDecision::RedirectToUnauthorized {
                            location: UNAUTHORIZED_PATH.to_string(),
                        },
                        audit: None,
                    }
                }
            }
            (None, false) => self.unauthenticated(path, &found),
            (None, true) => match &snapshot.error {
                Some(message) if !snapshot.resolving => self.session_error(path, message.clone()),
                _ => Navigation {
                    path: path.to_string(),
                    state: Some(GuardState::Resolving),
                    decision: GuardDecision::Loading,
                    audit: None,
                },
            },
        }
    }

    fn authorize(&self, path: &str, found: &RouteMatch<'_>, principal: &Principal) -> Navigation {
        if found.route.guest_only {
            return self.allowed(path, found, principal);
        }

        if self.evaluator.can_access(found.route, Some(principal.role), Some(&principal.permissions)) {
            return self.allowed(path, found, principal);
        }

        let record = AuditRecord::denied(principal, path, found.route);
        self.audit.record(&record);

        Navigation {
            path: path.to_string(),
            state: Some(GuardState::AuthenticatedDenied),
            decision: GuardDecision::RedirectToUnauthorized {
                location: UNAUTHORIZED_PATH.to_string(),
            },
            audit: Some(record),
        }
    }

    fn allowed(&self, path: &str, found: &RouteMatch<'_>, principal: &Principal) -> Navigation {
        if found.route.guest_only || found.route.dashboard_redirect {
            return Navigation {
                path: path.to_string(),
                state: Some(GuardState::AuthenticatedAllowed),
                decision: GuardDecision::Redirect {
                    location: dashboard_path_for(Some(principal.role)).to_string(),
                },
                audit: None,
            };
        }

        self.render(path, Some(GuardState::AuthenticatedAllowed), found)
    }

    fn unauthenticated(&self, path: &str, found: &RouteMatch<'_>) -> Navigation {
        // login and register render for anonymous visitors
        if found.route.guest_only {
            return self.render(path, None, found);
        }

        tracing::debug!(path = %path, "unauthenticated navigation, redirecting to login");
        Navigation {
            path: path.to_string(),
            state: Some(GuardState::Unauthenticated),
            decision: GuardDecision::RedirectToLogin {
                location: LOGIN_PATH.to_string(),
                from: path.to_string(),
            },
            audit: None,
        }
    }

    fn session_error(&self, path: &str, message: String) -> Navigation {
        Navigation {
            path: path.to_string(),
            state: Some(GuardState::Error),
            decision: GuardDecision::SessionError {
                message,
                retry: true,
                fallback: SessionFallback::Logout {
                    then: LOGIN_PATH.to_string(),
                },
            },
            audit: None,
        }
    }

    fn render(&self, path: &str, state: Option<GuardState>, found: &RouteMatch<'_>) -> Navigation {
        Navigation {
            path: path.to_string(),
            state,
            decision: GuardDecision::Render {
                view: found.route.view,
                route: found.route.name.clone(),
                pattern: found.pattern.clone(),
                params: found.params.clone(),
            },
            audit: None,
        }
    }

    fn not_found(&self, path: &str) -> Navigation {
        Navigation {
            path: path.to_string(),
            state: None,
            decision: GuardDecision::NotFound,
            audit: None,
        }
    }
}
