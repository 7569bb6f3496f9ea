use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use portal_gate::audit::TracingAuditSink;
use portal_gate::authz::{permissions_for, Permission, Principal, Role};
use portal_gate::config::{load_env, ShellConfig};
use portal_gate::guard::RouteGuard;
use portal_gate::navigation::{navigation_menu, RouteDescriptor, RouteTable};
use portal_gate::session::{
    fingerprint, BootstrapResult, FileTokenStore, HttpCredentialExchange, SessionContext, TokenStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "portal route and session tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every route with its requirements
    Routes,
    /// Print the navigation menu a role would see
    Menu {
        #[arg(long)]
        role: Role,
    },
    /// Evaluate a navigation for a role without touching the session
    Check {
        #[arg(long)]
        role: Role,
        #[arg(long)]
        path: String,
        /// Explicit permission grant; replaces the role's defaults when given
        #[arg(long = "permission")]
        permissions: Vec<Permission>,
    },
    /// Show the persisted session
    Status,
    /// Exchange the persisted refresh token
    Refresh,
    /// Clear the persisted session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();
    let cli = Cli::parse();
    let config = ShellConfig::from_env()?;

    match cli.command {
        Commands::Routes => {
            let table = RouteTable::builtin()?;
            for (path, route) in table.flatten() {
                println!("{:<48} {:<24} {}", path, route.name, requirements(route));
            }
        }
        Commands::Menu { role } => {
            let table = RouteTable::builtin()?;
            let permissions = permissions_for(role);
            print_menu(&navigation_menu(table.routes(), Some(role), Some(&permissions)), 0);
        }
        Commands::Check { role, path, permissions } => {
            if !path.starts_with('/') {
                anyhow::bail!("path must start with '/': {}", path);
            }
            check(role, &path, permissions)?;
        }
        Commands::Status => {
            let store = FileTokenStore::new(&config.token_store_path);
            let tokens = store.load()?;
            println!("store:   {}", store.path().display());
            match (&tokens.access_token, &tokens.refresh_token) {
                (Some(access), refresh) => {
                    println!("access:  {}", fingerprint(access));
                    println!("refresh: {}", refresh.as_deref().map(fingerprint).unwrap_or_else(|| "-".to_string()));
                }
                (None, _) => println!("no persisted session"),
            }
        }
        Commands::Refresh => {
            let session = open_session(&config)?;
            match session.refresh().await {
                BootstrapResult::Resolved(principal) => {
                    println!("{}", serde_json::to_string_pretty(&principal)?);
                }
                BootstrapResult::NoCredential => println!("no persisted session"),
                BootstrapResult::AuthError(reason) => anyhow::bail!("session rejected, tokens cleared: {}", reason),
                BootstrapResult::TransportError(reason) => anyhow::bail!("refresh failed, tokens kept: {}", reason),
            }
        }
        Commands::Logout => {
            let session = open_session(&config)?;
            session.logout().await?;
            println!("Logged out");
        }
    }

    Ok(())
}

fn open_session(config: &ShellConfig) -> anyhow::Result<SessionContext> {
    let store = Arc::new(FileTokenStore::new(&config.token_store_path));
    let exchange = Arc::new(HttpCredentialExchange::new(&config.api_base_url, config.exchange_timeout)?);
    SessionContext::load(store, exchange).context("failed to open session store")
}

fn check(role: Role, path: &str, permissions: Vec<Permission>) -> anyhow::Result<()> {
    let guard = RouteGuard::new(Arc::new(RouteTable::builtin()?), Arc::new(TracingAuditSink));

    let mut principal = Principal::new("cli", "cli@localhost", role);
    if !permissions.is_empty() {
        principal = principal.with_permissions(permissions);
    }

    // a denial is also logged on the `security` target
    let navigation = guard.decide_for(&principal, path);
    println!("{}", serde_json::to_string_pretty(&navigation)?);

    Ok(())
}

// Logs go to stderr so command output stays pipeable.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,security=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn requirements(route: &RouteDescriptor) -> String {
    if route.is_public {
        return "public".to_string();
    }
    if !route.has_requirements() {
        return "authenticated".to_string();
    }

    let mut parts: Vec<&str> = route.required_roles.iter().map(Role::as_str).collect();
    parts.extend(route.required_permissions.iter().map(Permission::as_str));
    parts.join(", ")
}

fn print_menu(routes: &[RouteDescriptor], depth: usize) {
    for route in routes {
        println!("{}{} ({})", "  ".repeat(depth), route.name, route.path);
        print_menu(&route.children, depth + 1);
    }
}
