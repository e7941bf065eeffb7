//! Transport error types.
//!
//! Every request made through a [`Transport`](crate::Transport) surfaces
//! failures as [`TransportError`]. Callers interpret only two conditions:
//! the captcha block and the HTTP status. Everything else is passed through.

/// Unified error type for the LingoKit transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying HTTP client failed (connect, timeout, TLS, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote answered with a status the caller treats as a failure.
    #[error("unexpected status {status} from {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The request URL.
        url: String,
    },

    /// The remote blocked the request and asked for a captcha to be solved.
    #[error(
        "request to {url} using user agent `{user_agent}` was blocked by a captcha; \
         change the user agent and log in again"
    )]
    Captcha {
        /// The request URL that was blocked.
        url: String,
        /// The `User-Agent` header that was sent.
        user_agent: String,
    },

    /// The response body was not the JSON the caller expected.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A request URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value could not be encoded.
    #[error("invalid header: {reason}")]
    InvalidHeader {
        /// What was wrong with the header.
        reason: String,
    },
}

impl TransportError {
    /// Whether this error is the captcha block.
    pub fn is_captcha(&self) -> bool {
        matches!(self, Self::Captcha { .. })
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience alias used throughout the transport crate.
pub type Result<T> = std::result::Result<T, TransportError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_status() {
        let err = TransportError::Status {
            status: 404,
            url: "https://example.com/users/nobody".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 404 from https://example.com/users/nobody"
        );
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn error_display_captcha_names_url_and_agent() {
        let err = TransportError::Captcha {
            url: "https://example.com/login".to_string(),
            user_agent: "test-agent/1.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("https://example.com/login"));
        assert!(msg.contains("test-agent/1.0"));
        assert!(err.is_captcha());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransportError>();
    }
}
