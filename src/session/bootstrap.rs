use std::sync::atomic::{AtomicBool, Ordering};

use super::exchange::ExchangeError;
use super::tokens::{fingerprint, TokenPair};
use super::{SessionContext, SessionState};
use crate::authz::Principal;

/// Outcome of resolving a principal from persisted credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapResult {
    Resolved(Principal),
    /// Nothing persisted; no exchange was attempted.
    NoCredential,
    /// The server rejected the refresh credential. Tokens have been cleared.
    AuthError(String),
    /// The exchange could not complete. Tokens are kept for a retry.
    TransportError(String),
}

impl SessionContext {
    /// Resolve the principal if a token is persisted and nobody has done so
    /// yet. Callers arriving while an exchange is in flight wait for it and
    /// reuse its result.
    pub async fn ensure_resolved(&self) -> BootstrapResult {
        if let Some(done) = self.settled().await {
            return done;
        }

        let _exchange = self.exchange_lock.lock().await;
        if let Some(done) = self.settled().await {
            return done;
        }
        self.run_exchange().await
    }

    /// Always exchange the refresh token (window focus, explicit retry).
    pub async fn refresh(&self) -> BootstrapResult {
        let _exchange = self.exchange_lock.lock().await;
        self.run_exchange().await
    }

    /// Opportunistic re-validation when the shell regains focus.
    pub async fn on_focus(&self) -> BootstrapResult {
        if !self.snapshot().await.has_token {
            return BootstrapResult::NoCredential;
        }
        self.refresh().await
    }

    async fn settled(&self) -> Option<BootstrapResult> {
        let state = self.state.read().await;
        if let Some(principal) = &state.principal {
            return Some(BootstrapResult::Resolved(principal.clone()));
        }
        if !state.tokens.has_access_token() {
            return Some(BootstrapResult::NoCredential);
        }
        None
    }

    /// Must be called with `exchange_lock` held.
    async fn run_exchange(&self) -> BootstrapResult {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let (access_token, refresh_token) = {
            let state = self.state.read().await;
            let Some(access_token) = state.tokens.access_token.clone() else {
                return BootstrapResult::NoCredential;
            };
            (access_token, state.tokens.refresh_token.clone())
        };
        // cleared on every exit, including a cancelled caller
        let _resolving = ResolvingFlag::raise(&self.resolving);

        let Some(refresh_token) = refresh_token else {
            return self.fail(epoch, ExchangeError::MissingRefreshToken).await;
        };

        tracing::debug!(refresh = %fingerprint(&refresh_token), "refreshing session");
        let outcome = self
            .exchange
            .refresh(&access_token, &refresh_token)
            .await
            .and_then(|payload| payload.into_session());

        match outcome {
            Ok((pair, principal)) => self.commit(epoch, pair, principal).await,
            Err(err) => self.fail(epoch, err).await,
        }
    }

    /// Install a freshly exchanged pair and principal, unless a logout
    /// happened since `epoch` was read.
    pub(super) async fn commit(&self, epoch: u64, pair: TokenPair, principal: Principal) -> BootstrapResult {
        let mut state = self.state.write().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            tracing::info!("discarding exchange result from an ended session");
            return BootstrapResult::NoCredential;
        }

        if let Err(err) = self.store.save(&pair) {
            // the in-memory session is still usable; the next cold start re-authenticates
            tracing::error!(error = %err, "failed to persist token pair");
        }

        *state = SessionState {
            tokens: pair.into(),
            principal: Some(principal.clone()),
            error: None,
        };

        tracing::info!(user_id = %principal.id, role = %principal.role, "session resolved");
        BootstrapResult::Resolved(principal)
    }

    async fn fail(&self, epoch: u64, err: ExchangeError) -> BootstrapResult {
        let mut state = self.state.write().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            return BootstrapResult::NoCredential;
        }

        if err.is_auth_class() {
            tracing::info!(reason = %err, "refresh credential rejected, clearing session");
            *state = SessionState::default();
            if let Err(store_err) = self.store.clear() {
                tracing::error!(error = %store_err, "failed to clear persisted tokens");
            }
            return BootstrapResult::AuthError(err.to_string());
        }

        tracing::warn!(reason = %err, "session resolution failed, keeping tokens for retry");
        state.error = Some(err.to_string());
        BootstrapResult::TransportError(err.to_string())
    }
}

struct ResolvingFlag<'a>(&'a AtomicBool);

impl<'a> ResolvingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for ResolvingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
