use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

const DEFAULT_API_URL: &str = "http://localhost:8080/api";
const DEFAULT_TOKEN_STORE: &str = ".portal/session.json";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_EXCHANGE_TIMEOUT_SECS: u64 = 10;

/// Shell configuration, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Base URL of the portal REST API; credential endpoints live under `/auth`.
    pub api_base_url: String,
    pub token_store_path: PathBuf,
    pub port: u16,
    pub exchange_timeout: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            token_store_path: PathBuf::from(DEFAULT_TOKEN_STORE),
            port: DEFAULT_PORT,
            exchange_timeout: Duration::from_secs(DEFAULT_EXCHANGE_TIMEOUT_SECS),
        }
    }
}

impl ShellConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable source, so tests don't touch
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let api_base_url = lookup("PORTAL_API_URL").unwrap_or(defaults.api_base_url);
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(AppError::configuration("PORTAL_API_URL must be an http(s) URL"));
        }

        let token_store_path = lookup("TOKEN_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.token_store_path);

        let port = lookup("APP_PORT")
            .map(|val| val.parse::<u16>())
            .unwrap_or(Ok(defaults.port))
            .map_err(|_| AppError::configuration("APP_PORT must be a valid port number"))?;

        let timeout_secs = lookup("EXCHANGE_TIMEOUT_SECS")
            .map(|val| val.parse::<u64>())
            .unwrap_or(Ok(DEFAULT_EXCHANGE_TIMEOUT_SECS))
            .map_err(|_| AppError::configuration("EXCHANGE_TIMEOUT_SECS must be a valid integer"))?;
        if timeout_secs == 0 {
            return Err(AppError::configuration("EXCHANGE_TIMEOUT_SECS must be positive"));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token_store_path,
            port,
            exchange_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Load `.env` from the working directory, falling back to the crate-local one.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}
