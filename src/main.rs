use portal_gate::config::{load_env, ShellConfig};
use portal_gate::session::BootstrapResult;
use portal_gate::{docs, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let config = ShellConfig::from_env()?;
    tracing::info!(api = %config.api_base_url, store = %config.token_store_path.display(), "starting portal shell");

    let state = AppState::from_config(&config)?;

    // resolve any persisted session in the background; navigations wait on the same exchange
    let session = state.session.clone();
    tokio::spawn(async move {
        match session.ensure_resolved().await {
            BootstrapResult::Resolved(principal) => tracing::info!(role = %principal.role, "restored session"),
            BootstrapResult::NoCredential => tracing::info!("no persisted session"),
            BootstrapResult::AuthError(reason) => tracing::info!(%reason, "persisted session rejected"),
            BootstrapResult::TransportError(reason) => tracing::warn!(%reason, "could not restore session"),
        }
    });

    let openapi = docs::build_openapi(config.port)?;
    let app = router(state).merge(docs::swagger_routes(openapi)?);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
