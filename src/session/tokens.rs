use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::AppError;

/// Access + refresh token, always written together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &fingerprint(&self.access_token))
            .field("refresh_token", &fingerprint(&self.refresh_token))
            .finish()
    }
}

/// What storage actually holds. A refresh token may be missing when the
/// file was written by something else; the pair is still cleared as a unit.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTokens {
    #[serde(rename = "token", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl PersistedTokens {
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }
}

impl std::fmt::Debug for PersistedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedTokens")
            .field("access_token", &self.access_token.as_deref().map(fingerprint))
            .field("refresh_token", &self.refresh_token.as_deref().map(fingerprint))
            .finish()
    }
}

impl From<TokenPair> for PersistedTokens {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: Some(pair.access_token),
            refresh_token: Some(pair.refresh_token),
        }
    }
}

/// Short, non-reversible token identifier for logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// Client-side persistence for the token pair.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<PersistedTokens, AppError>;
    fn save(&self, pair: &TokenPair) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// JSON file with the `token` and `refreshToken` keys.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<PersistedTokens, AppError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(PersistedTokens::default()),
            Err(err) => return Err(err.into()),
        };

        match serde_json::from_slice::<PersistedTokens>(&raw) {
            Ok(tokens) => Ok(tokens),
            Err(err) => {
                // an unreadable file is the same as no session
                tracing::warn!(path = %self.path.display(), error = %err, "discarding corrupt token file");
                Ok(PersistedTokens::default())
            }
        }
    }

    fn save(&self, pair: &TokenPair) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        // write-then-rename so readers never observe half a pair
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer(&mut tmp, pair)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|err| AppError::Storage(err.error))?;

        tracing::debug!(path = %self.path.display(), access = %fingerprint(&pair.access_token), "token pair persisted");
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-process store, used by tests and ephemeral shells.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<PersistedTokens>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(pair: TokenPair) -> Self {
        Self {
            inner: Mutex::new(pair.into()),
        }
    }

    /// Only an access token, as left behind by an older client.
    pub fn with_access_token(access_token: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(PersistedTokens {
                access_token: Some(access_token.into()),
                refresh_token: None,
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<PersistedTokens, AppError> {
        let guard = self.inner.lock().map_err(|_| AppError::internal("token store poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, pair: &TokenPair) -> Result<(), AppError> {
        let mut guard = self.inner.lock().map_err(|_| AppError::internal("token store poisoned"))?;
        *guard = pair.clone().into();
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        let mut guard = self.inner.lock().map_err(|_| AppError::internal("token store poisoned"))?;
        *guard = PersistedTokens::default();
        Ok(())
    }
}
