//! Transport layer for LingoKit.
//!
//! Every call the client makes to the remote learning service goes through
//! the [`Transport`] trait:
//!
//! - [`TransportRequest`] / [`Response`]: a minimal JSON request/response pair
//! - [`HttpTransport`]: the `reqwest` implementation with bearer-token
//!   injection and captcha detection
//! - [`TransportError`]: the single error type for this crate
//! - `testing::ScriptedTransport` (feature `test-util`): an in-memory fake
//!
//! There is no retry or backoff. A timeout or a captcha block is returned to
//! the caller as a hard failure.

pub mod error;
pub mod http;
#[cfg(feature = "test-util")]
pub mod testing;
pub mod traits;

pub use error::{Result, TransportError};
pub use http::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, HttpTransport};
pub use traits::{CAPTCHA_MARKER, Method, Response, Transport, TransportRequest};
