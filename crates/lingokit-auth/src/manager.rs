//! Credential lifecycle manager.
//!
//! The [`CredentialManager`] resolves a bearer token for one identifier and
//! installs it in the transport. Resolution order:
//!
//! 1. An explicit token, if it passes the validation probe.
//! 2. A token cached in the session file, if it passes the probe.
//! 3. An interactive login with identifier + secret.
//!
//! The probe is a single `GET` of the user's profile and never mutates
//! remote state. Once a token is obtained it is kept for the lifetime of
//! the manager; only [`CredentialManager::refresh`] replaces it.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use lingokit_transport::{Transport, TransportError, TransportRequest};
use serde_json::json;

use crate::error::{AuthError, Result};
use crate::session::{FileSessionStore, SessionStore};

/// Response header carrying a freshly issued token.
const TOKEN_HEADER: &str = "jwt";

/// Key in a login response that marks a rejected login.
const FAILURE_KEY: &str = "failure";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What the caller supplied to authenticate with.
#[derive(Clone, Default)]
pub struct Credentials {
    /// The account identifier (username or email).
    pub identifier: String,
    /// The account password.
    pub secret: Option<String>,
    /// A previously issued bearer token.
    pub token: Option<String>,
    /// Where to cache the token between runs.
    pub session_file: Option<PathBuf>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("session_file", &self.session_file)
            .finish()
    }
}

impl Credentials {
    /// Credentials for `identifier` with no source attached yet.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// Attach a password.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Attach an explicit bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Attach a session cache file.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }
}

/// Which acquisition path produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// The caller passed the token in.
    Explicit,
    /// The token came from the session file.
    SessionFile,
    /// The token was issued by an interactive login.
    Login,
}

/// An opaque bearer token and where it came from.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    token: String,
    source: TokenSource,
}

impl BearerToken {
    /// The raw token string.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// The acquisition path.
    pub fn source(&self) -> TokenSource {
        self.source
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CredentialManager
// ---------------------------------------------------------------------------

/// Owns the login state for one identifier.
pub struct CredentialManager {
    transport: Arc<dyn Transport>,
    base_url: String,
    credentials: Credentials,
    store: Option<Box<dyn SessionStore>>,
    current: Mutex<Option<BearerToken>>,
}

impl CredentialManager {
    /// Create a manager. `base_url` is the service root, without a trailing
    /// slash. A session file in `credentials` gets a [`FileSessionStore`].
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        let store = credentials
            .session_file
            .clone()
            .map(|path| Box::new(FileSessionStore::new(path)) as Box<dyn SessionStore>);
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            store,
            current: Mutex::new(None),
        }
    }

    /// Replace the session store (e.g. with a non-file backend).
    pub fn with_store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The identifier being authenticated.
    pub fn identifier(&self) -> &str {
        &self.credentials.identifier
    }

    /// The token obtained so far, if any.
    pub fn current(&self) -> Option<BearerToken> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    /// Resolve a bearer token and install it in the transport.
    ///
    /// Returns the already-resolved token on repeated calls.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] if the login response carries the
    /// failure indicator, [`AuthError::Transport`] for any other non-success
    /// login status, [`AuthError::CaptchaRequired`] if any request is captcha-blocked,
    /// [`AuthError::MissingCredentialSource`] if no token validates and no
    /// secret is available.
    pub async fn authenticate(&self) -> Result<BearerToken> {
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let identifier = self.identifier();

        if let Some(token) = self.credentials.token.clone() {
            if self.probe(&token).await? {
                tracing::info!(user = %identifier, "authenticated with supplied token");
                return Ok(self.install(token, TokenSource::Explicit));
            }
            tracing::debug!(user = %identifier, "supplied token rejected by probe");
        }

        if let Some(token) = self.load_cached() {
            if self.probe(&token).await? {
                tracing::info!(user = %identifier, "authenticated with cached session");
                return Ok(self.install(token, TokenSource::SessionFile));
            }
            tracing::debug!(user = %identifier, "cached session rejected by probe");
        }

        let token = self.login().await?;
        Ok(self.install(token, TokenSource::Login))
    }

    /// Discard the current token, drop it from the session cache and log in
    /// again with the secret.
    ///
    /// # Errors
    ///
    /// Same as the login step of [`authenticate`](Self::authenticate).
    pub async fn refresh(&self) -> Result<BearerToken> {
        if let Ok(mut guard) = self.current.lock() {
            *guard = None;
        }
        self.transport.set_bearer_token(None);
        self.clear_cached();

        let token = self.login().await?;
        Ok(self.install(token, TokenSource::Login))
    }

    // -- Internal helpers ---------------------------------------------------

    /// Check a candidate token with a read-only request.
    ///
    /// Non-captcha transport failures count as "not valid".
    async fn probe(&self, token: &str) -> Result<bool> {
        self.transport.set_bearer_token(Some(token.to_string()));

        let url = format!("{}/users/{}", self.base_url, self.identifier());
        let valid = match self.transport.request(TransportRequest::get(url)).await {
            Ok(response) => response.status == 200,
            Err(err @ TransportError::Captcha { .. }) => {
                self.transport.set_bearer_token(None);
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!(user = %self.identifier(), error = %err, "validation probe failed");
                false
            }
        };

        if !valid {
            self.transport.set_bearer_token(None);
        }
        Ok(valid)
    }

    /// Perform the interactive login and cache the issued token.
    async fn login(&self) -> Result<String> {
        let identifier = self.identifier();
        let secret =
            self.credentials
                .secret
                .as_deref()
                .ok_or_else(|| AuthError::MissingCredentialSource {
                    identifier: identifier.to_string(),
                })?;

        tracing::debug!(user = %identifier, "logging in");

        let url = format!("{}/login", self.base_url);
        let body = json!({ "login": identifier, "password": secret });
        let response = self
            .transport
            .request(TransportRequest::post(url.clone(), body))
            .await?;

        let payload = response.json().unwrap_or(serde_json::Value::Null);
        if payload.get(FAILURE_KEY).is_some() {
            return Err(AuthError::InvalidCredentials {
                identifier: identifier.to_string(),
            });
        }
        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                url,
            }
            .into());
        }

        let token = response
            .header(TOKEN_HEADER)
            .map(str::to_string)
            .or_else(|| {
                payload
                    .get(TOKEN_HEADER)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidCredentials {
                identifier: identifier.to_string(),
            })?;

        self.save_cached(&token);
        tracing::info!(user = %identifier, "logged in");
        Ok(token)
    }

    fn install(&self, token: String, source: TokenSource) -> BearerToken {
        self.transport.set_bearer_token(Some(token.clone()));
        let bearer = BearerToken { token, source };
        if let Ok(mut guard) = self.current.lock() {
            *guard = Some(bearer.clone());
        }
        bearer
    }

    fn load_cached(&self) -> Option<String> {
        let store = self.store.as_ref()?;
        match store.load() {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable session file");
                None
            }
        }
    }

    fn clear_cached(&self) {
        if let Some(store) = &self.store {
            if let Err(err) = store.clear() {
                tracing::warn!(error = %err, "failed to clear session file");
            }
        }
    }

    fn save_cached(&self, token: &str) {
        if let Some(store) = &self.store {
            if let Err(err) = store.save(token) {
                tracing::warn!(error = %err, "failed to write session file");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
