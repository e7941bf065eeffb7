//! Credential lifecycle for LingoKit.
//!
//! This crate acquires, caches and validates the opaque bearer token used
//! for every authenticated request:
//!
//! - **[`CredentialManager`]**: explicit token, then cached session, then
//!   interactive login, with captcha detection on every step
//! - **[`FileSessionStore`]**: the `{"jwt_session": ...}` cache file
//!
//! ```text
//! CredentialManager
//! ├── Transport      (probe + login requests)
//! └── SessionStore   (durable token slot)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lingokit_auth::{CredentialManager, Credentials};
//! use lingokit_transport::HttpTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new()?);
//! let credentials = Credentials::new("amy")
//!     .with_secret("correct horse")
//!     .with_session_file("data/session.json");
//!
//! let manager = CredentialManager::new(transport, "https://www.duolingo.com", credentials);
//! let token = manager.authenticate().await?;
//! println!("authenticated via {:?}", token.source());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod manager;
pub mod session;

pub use error::{AuthError, Result};
pub use manager::{BearerToken, CredentialManager, Credentials, TokenSource};
pub use session::{FileSessionStore, SESSION_KEY, SessionStore};
