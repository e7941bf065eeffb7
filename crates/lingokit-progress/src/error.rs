//! Error types for the progress crate.
//!
//! [`GraphError`] belongs to the skill-ordering pass and is pure: no I/O is
//! involved. [`ProgressError`] is what the [`Lingo`](crate::Lingo) facade
//! and the audio crawler return.

use lingokit_auth::AuthError;
use lingokit_transport::TransportError;

/// Errors from computing skill dependency depths.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A skill (transitively) depends on itself.
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    CycleDetected {
        /// Skill names from the top-level skill down to the repeated name.
        path: Vec<String>,
    },

    /// A dependency name does not match any skill in the set.
    #[error("skill `{skill}` depends on unknown skill `{name}`")]
    UnknownDependency {
        /// The skill holding the dangling reference.
        skill: String,
        /// The name that did not resolve.
        name: String,
    },
}

/// Unified error type for the progress crate.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// Authentication failed, or a request was captcha-blocked.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The skill graph could not be ordered.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A transport failure, passed through.
    #[error(transparent)]
    Transport(TransportError),

    /// The user profile does not exist.
    #[error("user not found: {identifier}")]
    UserNotFound {
        /// The identifier that was looked up.
        identifier: String,
    },

    /// The user has no data for this language.
    #[error("no data for language `{abbr}`")]
    UnknownLanguage {
        /// The language abbreviation.
        abbr: String,
    },

    /// The user record lacks a field needed to fill in a default.
    #[error("user record has no `{field}`")]
    MissingField {
        /// Name of the absent field.
        field: &'static str,
    },

    /// Configuration is missing or malformed.
    #[error("invalid configuration: {reason}")]
    Config {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// I/O error (e.g. reading a config file).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for ProgressError {
    fn from(err: TransportError) -> Self {
        if err.is_captcha() {
            Self::Auth(AuthError::from(err))
        } else {
            Self::Transport(err)
        }
    }
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ProgressError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
