use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::audit::{init_audit_bus, AuditBus, AuditSinks, BroadcastAuditSink, TracingAuditSink};
use crate::config::ShellConfig;
use crate::errors::AppError;
use crate::guard::RouteGuard;
use crate::navigation::RouteTable;
use crate::routes::{health, navigation, session};
use crate::session::{FileTokenStore, HttpCredentialExchange, SessionContext};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionContext>,
    pub guard: Arc<RouteGuard>,
    /// Denial records as JSON, for forwarders to subscribe to.
    pub audit_bus: AuditBus,
}

impl AppState {
    pub fn new(session: SessionContext, guard: RouteGuard, audit_bus: AuditBus) -> Self {
        Self {
            session: Arc::new(session),
            guard: Arc::new(guard),
            audit_bus,
        }
    }

    /// File-backed tokens, HTTP credential exchange, audit to the log and the bus.
    pub fn from_config(config: &ShellConfig) -> Result<Self, AppError> {
        let store = Arc::new(FileTokenStore::new(&config.token_store_path));
        let exchange = Arc::new(HttpCredentialExchange::new(&config.api_base_url, config.exchange_timeout)?);
        let session = SessionContext::load(store, exchange)?;

        let (audit_bus, _) = init_audit_bus();
        let audit = AuditSinks::new()
            .with(TracingAuditSink)
            .with(BroadcastAuditSink::new(audit_bus.clone()));

        let table = RouteTable::builtin().map_err(|err| AppError::configuration(err.to_string()))?;
        let guard = RouteGuard::new(Arc::new(table), Arc::new(audit));

        Ok(Self::new(session, guard, audit_bus))
    }
}

pub async fn create_app(config: &ShellConfig) -> Result<Router, AppError> {
    let state = AppState::from_config(config)?;
    Ok(router(state))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let session_routes = Router::new()
        .route("/", get(session::current))
        .route("/login", post(session::login))
        .route("/register", post(session::register))
        .route("/refresh", post(session::refresh))
        .route("/logout", post(session::logout))
        .route("/authorize", post(session::authorize));

    let navigation_routes = Router::new()
        .route("/menu", get(navigation::menu))
        .route("/routes", get(navigation::routes));

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/navigate", get(navigation::navigate))
        .nest("/api/session", session_routes)
        .nest("/api/navigation", navigation_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
