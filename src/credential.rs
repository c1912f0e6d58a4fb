//! Gemini API key lookup and storage.
//!
//! Lookup order:
//! 1. `GEMINI_API_KEY` environment variable (a `.env` file is loaded first)
//! 2. `apiKey` in `~/.easy-commit-config.json`
//!
//! The key is resolved once per command and passed explicitly to the client.

use std::env;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::CredentialError;

/// Environment variable holding the API key.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

/// File name of the credential file in the home directory.
pub const CONFIG_FILE_NAME: &str = ".easy-commit-config.json";

/// An opaque API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key. Returns `None` for blank input.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The secret value, for placing into a request.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Serialize, Deserialize)]
struct CredentialFile {
    #[serde(rename = "apiKey", default)]
    api_key: Option<String>,
}

/// Default credential file location (`~/.easy-commit-config.json`).
pub fn default_config_path() -> Result<PathBuf, CredentialError> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or(CredentialError::NoHomeDirectory)
}

/// Resolve the API key from the environment, then from the credential file.
///
/// Absence is `Ok(None)`; only a credential file that exists but cannot be
/// read or parsed is an error.
pub fn resolve_credential(config_path: &Path) -> Result<Option<ApiKey>, CredentialError> {
    // A missing .env file is the common case.
    let _ = dotenvy::dotenv();

    if let Some(key) = env::var(API_KEY_ENV_VAR).ok().and_then(ApiKey::new) {
        debug!("Using API key from {}", API_KEY_ENV_VAR);
        return Ok(Some(key));
    }

    if !config_path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(config_path).map_err(|e| CredentialError::Unreadable {
        path: config_path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let file: CredentialFile =
        serde_json::from_str(&content).map_err(|e| CredentialError::Unreadable {
            path: config_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let key = file.api_key.and_then(ApiKey::new);
    if key.is_some() {
        debug!("Using API key from {}", config_path.display());
    }
    Ok(key)
}

/// Write the API key to the credential file atomically.
pub fn save_credential(config_path: &Path, key: &ApiKey) -> Result<(), CredentialError> {
    let dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let contents = serde_json::to_string_pretty(&CredentialFile {
        api_key: Some(key.expose().to_string()),
    })
    .map_err(|e| CredentialError::WriteFailed(std::io::Error::other(e)))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(CredentialError::WriteFailed)?;
    tmp.write_all(contents.as_bytes())
        .map_err(CredentialError::WriteFailed)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))
            .map_err(CredentialError::WriteFailed)?;
    }

    tmp.persist(config_path)
        .map_err(|e| CredentialError::WriteFailed(e.error))?;
    Ok(())
}

/// Delete the credential file.
pub fn reset_credential(config_path: &Path) -> Result<(), CredentialError> {
    if !config_path.exists() {
        return Err(CredentialError::NotConfigured);
    }
    std::fs::remove_file(config_path).map_err(CredentialError::WriteFailed)
}
