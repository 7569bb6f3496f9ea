#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use portal_gate::audit::{init_audit_bus, RecordingAuditSink};
use portal_gate::guard::RouteGuard;
use portal_gate::navigation::RouteTable;
use portal_gate::session::{
    CredentialExchange, ExchangeError, ExchangePayload, LoginRequest, MemoryTokenStore, RegisterRequest, SessionContext,
    TokenPair,
};
use portal_gate::AppState;

/// Credential exchange that counts calls and answers from a fixed script:
/// `failure` for every call, or a transport error for the first
/// `transient_failures` calls and success afterwards.
pub struct ScriptedExchange {
    calls: AtomicUsize,
    role: String,
    permissions: Option<Vec<String>>,
    failure: Option<ExchangeError>,
    transient_failures: usize,
    delay: Duration,
}

impl ScriptedExchange {
    pub fn succeeding(role: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            role: role.to_string(),
            permissions: None,
            failure: None,
            transient_failures: 0,
            delay: Duration::ZERO,
        }
    }

    /// Unreachable for the first `failures` calls, then succeeding as `role`.
    pub fn recovering(role: &str, failures: usize) -> Self {
        Self {
            transient_failures: failures,
            ..Self::succeeding(role)
        }
    }

    pub fn rejecting() -> Self {
        Self::failing(ExchangeError::Rejected {
            status: 401,
            message: "Refresh token expired".to_string(),
        })
    }

    pub fn unreachable() -> Self {
        Self::failing(ExchangeError::Transport("connection refused".to_string()))
    }

    pub fn failing(failure: ExchangeError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::succeeding("STUDENT")
        }
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self) -> Result<ExchangePayload, ExchangeError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        if n <= self.transient_failures {
            return Err(ExchangeError::Transport("connection refused".to_string()));
        }

        Ok(ExchangePayload {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            role: self.role.clone(),
            organization_id: Some("org-1".to_string()),
            permissions: self.permissions.clone(),
            id: Some(format!("{}-user", self.role.to_lowercase())),
            email: Some(format!("{}@example.com", self.role.to_lowercase())),
        })
    }
}

#[async_trait]
impl CredentialExchange for ScriptedExchange {
    async fn refresh(&self, _access_token: &str, _refresh_token: &str) -> Result<ExchangePayload, ExchangeError> {
        self.answer().await
    }

    async fn login(&self, _request: &LoginRequest) -> Result<ExchangePayload, ExchangeError> {
        self.answer().await
    }

    async fn register(&self, _request: &RegisterRequest) -> Result<ExchangePayload, ExchangeError> {
        self.answer().await
    }
}

pub struct Harness {
    pub session: Arc<SessionContext>,
    pub guard: RouteGuard,
    pub store: Arc<MemoryTokenStore>,
    pub exchange: Arc<ScriptedExchange>,
    pub audit: Arc<RecordingAuditSink>,
}

/// Session with a persisted token pair (or none) plus a guard over the builtin table.
pub fn harness(persisted: bool, exchange: ScriptedExchange) -> anyhow::Result<Harness> {
    let store = Arc::new(if persisted {
        MemoryTokenStore::with_tokens(TokenPair::new("stored-access", "stored-refresh"))
    } else {
        MemoryTokenStore::new()
    });
    let exchange = Arc::new(exchange);
    let audit = Arc::new(RecordingAuditSink::new());

    let session = Arc::new(SessionContext::load(store.clone(), exchange.clone())?);
    let guard = RouteGuard::new(Arc::new(RouteTable::builtin()?), audit.clone());

    Ok(Harness {
        session,
        guard,
        store,
        exchange,
        audit,
    })
}

pub fn app_state(persisted: bool, exchange: ScriptedExchange) -> anyhow::Result<(AppState, Arc<ScriptedExchange>)> {
    let store = Arc::new(if persisted {
        MemoryTokenStore::with_tokens(TokenPair::new("stored-access", "stored-refresh"))
    } else {
        MemoryTokenStore::new()
    });
    let exchange = Arc::new(exchange);

    let session = SessionContext::load(store, exchange.clone())?;
    let guard = RouteGuard::new(Arc::new(RouteTable::builtin()?), Arc::new(RecordingAuditSink::new()));
    let (audit_bus, _) = init_audit_bus();

    Ok((AppState::new(session, guard, audit_bus), exchange))
}
