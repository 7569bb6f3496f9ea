//! Session context: the persisted token pair and the resolved principal.
//!
//! Everything that writes session state lives here or in `bootstrap`
//! (refresh, login, register, logout). Readers take a [`SessionSnapshot`].

mod bootstrap;
mod exchange;
mod tokens;

pub use bootstrap::BootstrapResult;
pub use exchange::{decode_payload, CredentialExchange, ExchangeError, ExchangePayload, HttpCredentialExchange, LoginRequest, RegisterRequest};
pub use tokens::{fingerprint, FileTokenStore, MemoryTokenStore, PersistedTokens, TokenPair, TokenStore};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use crate::authz::Principal;
use crate::errors::{AppError, AppResult};

/// Coarse session status, as shown to operators and health checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unauthenticated,
    Resolving,
    Error,
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::Resolving => "resolving",
            SessionStatus::Error => "error",
            SessionStatus::Authenticated => "authenticated",
        }
    }
}

#[derive(Default)]
struct SessionState {
    tokens: PersistedTokens,
    principal: Option<Principal>,
    error: Option<String>,
}

/// Read-only view of the session without token values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub has_token: bool,
    pub principal: Option<Principal>,
    pub error: Option<String>,
    pub resolving: bool,
}

impl SessionSnapshot {
    pub fn status(&self) -> SessionStatus {
        match (&self.principal, self.has_token) {
            (Some(_), _) => SessionStatus::Authenticated,
            (None, false) => SessionStatus::Unauthenticated,
            (None, true) if self.error.is_some() && !self.resolving => SessionStatus::Error,
            (None, true) => SessionStatus::Resolving,
        }
    }
}

pub struct SessionContext {
    store: Arc<dyn TokenStore>,
    exchange: Arc<dyn CredentialExchange>,
    state: RwLock<SessionState>,
    /// Serializes credential exchanges.
    exchange_lock: Mutex<()>,
    /// Bumped on logout; exchange results from an older epoch are discarded.
    epoch: AtomicU64,
    /// Set while a refresh exchange is awaited. Lives outside `state` so a
    /// dropped exchange future can clear it synchronously.
    resolving: AtomicBool,
}

impl SessionContext {
    /// Start from whatever the store holds. No principal is resolved yet.
    pub fn load(store: Arc<dyn TokenStore>, exchange: Arc<dyn CredentialExchange>) -> AppResult<Self> {
        let tokens = store.load()?;
        tracing::info!(has_token = tokens.has_access_token(), "session loaded from storage");

        Ok(Self {
            store,
            exchange,
            state: RwLock::new(SessionState {
                tokens,
                ..SessionState::default()
            }),
            exchange_lock: Mutex::new(()),
            epoch: AtomicU64::new(0),
            resolving: AtomicBool::new(false),
        })
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read().await;
        SessionSnapshot {
            has_token: state.tokens.has_access_token(),
            principal: state.principal.clone(),
            error: state.error.clone(),
            resolving: self.resolving.load(Ordering::SeqCst),
        }
    }

    pub async fn principal(&self) -> Option<Principal> {
        self.state.read().await.principal.clone()
    }

    pub async fn login(&self, request: &LoginRequest) -> AppResult<Principal> {
        let _exchange = self.exchange_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = self.exchange.login(request).await;
        self.complete_sign_in(epoch, result).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> AppResult<Principal> {
        let _exchange = self.exchange_lock.lock().await;
        let epoch = self.epoch.load(Ordering::SeqCst);
        let result = self.exchange.register(request).await;
        self.complete_sign_in(epoch, result).await
    }

    async fn complete_sign_in(&self, epoch: u64, result: Result<ExchangePayload, ExchangeError>) -> AppResult<Principal> {
        let payload = result.map_err(|err| match err {
            ExchangeError::Rejected { message, .. } => AppError::unauthenticated(message),
            ExchangeError::InvalidPayload(message) => AppError::internal(message),
            other => AppError::session_transport(other.to_string()),
        })?;
        let (pair, principal) = payload
            .into_session()
            .map_err(|err| AppError::internal(err.to_string()))?;

        match self.commit(epoch, pair, principal).await {
            BootstrapResult::Resolved(principal) => {
                tracing::info!(user_id = %principal.id, role = %principal.role, "signed in");
                Ok(principal)
            }
            _ => Err(AppError::unauthenticated("session ended while signing in")),
        }
    }

    /// Drop tokens, principal and error together.
    pub async fn logout(&self) -> AppResult<()> {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        let user_id = state.principal.as_ref().map(|principal| principal.id.clone());
        *state = SessionState::default();
        self.store.clear()?;
        tracing::info!(user_id = ?user_id, "logged out");
        Ok(())
    }
}
