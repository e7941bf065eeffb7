//! Error types for the auth crate.
//!
//! All credential operations surface errors through [`AuthError`]. A captcha
//! block coming up from the transport is lifted into
//! [`AuthError::CaptchaRequired`] so callers match on one variant regardless
//! of which request tripped it.

use lingokit_transport::TransportError;

/// Unified error type for LingoKit authentication.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The remote rejected the identifier/secret pair.
    #[error("login failed for {identifier}: invalid credentials")]
    InvalidCredentials {
        /// The identifier that was rejected.
        identifier: String,
    },

    /// The remote demands a captcha. Never retried automatically.
    #[error(
        "request to {url} using user agent `{user_agent}` was blocked by a captcha; \
         change the user agent and log in again"
    )]
    CaptchaRequired {
        /// The blocked request URL.
        url: String,
        /// The `User-Agent` header that was sent.
        user_agent: String,
    },

    /// No usable token was found and no secret was supplied to log in with.
    #[error("no credential source for {identifier}: supply a password, a token or a session file")]
    MissingCredentialSource {
        /// The identifier that could not be authenticated.
        identifier: String,
    },

    /// The session cache file could not be read, parsed or written.
    #[error("session file {path}: {reason}")]
    SessionFile {
        /// Path of the session file.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// Any other transport failure, passed through uninterpreted.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
}

impl From<TransportError> for AuthError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Captcha { url, user_agent } => Self::CaptchaRequired { url, user_agent },
            other => Self::Transport(other),
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
