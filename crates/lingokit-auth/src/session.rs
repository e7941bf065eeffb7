//! Durable bearer-token cache.
//!
//! A [`SessionStore`] persists the bearer token between process runs so the
//! client can skip the interactive login. [`FileSessionStore`] is the
//! file-backed implementation. Its on-disk format is a single JSON object:
//!
//! ```text
//! {"jwt_session": "<token>"}
//! ```
//!
//! A missing file, or a file without the key, means "no cached token". The
//! file is written with mode 0600 on Unix.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, Result};

/// Key under which the token is stored.
pub const SESSION_KEY: &str = "jwt_session";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A single durable slot holding an optional bearer token.
pub trait SessionStore: Send + Sync {
    /// Load the cached token. `Ok(None)` if nothing is cached.
    fn load(&self) -> Result<Option<String>>;

    /// Store (or overwrite) the cached token.
    fn save(&self, token: &str) -> Result<()>;

    /// Remove the cached token.
    fn clear(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jwt_session: Option<String>,
}

/// Session store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Create a store at `path`. Nothing is touched until the first call.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn error(&self, reason: impl std::fmt::Display) -> AuthError {
        AuthError::SessionFile {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let data = std::fs::read_to_string(&self.path).map_err(|e| self.error(e))?;
        let file: SessionFile = serde_json::from_str(&data).map_err(|e| self.error(e))?;

        tracing::debug!(path = %self.path.display(), found = file.jwt_session.is_some(), "loaded session file");
        Ok(file.jwt_session.filter(|t| !t.is_empty()))
    }

    fn save(&self, token: &str) -> Result<()> {
        let file = SessionFile {
            jwt_session: Some(token.to_string()),
        };
        let data = serde_json::to_string(&file).map_err(|e| self.error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.error(e))?;
        }

        std::fs::write(&self.path, data).map_err(|e| self.error(e))?;

        // Owner read/write only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms).map_err(|e| self.error(e))?;
        }

        tracing::debug!(path = %self.path.display(), "saved session file");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).map_err(|e| self.error(e))?;
            tracing::debug!(path = %self.path.display(), "removed session file");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
