//! `reqwest`-backed transport.
//!
//! [`HttpTransport`] sends JSON requests with a fixed `User-Agent`, injects
//! `Authorization: Bearer <token>` once a token is installed, and turns the
//! captcha block into an error on every call, not just login.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::error::{Result, TransportError};
use crate::traits::{Method, Response, Transport, TransportRequest};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default `User-Agent`. The remote is picky about non-browser agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTTP transport built on a shared [`reqwest::Client`].
pub struct HttpTransport {
    client: reqwest::Client,
    user_agent: String,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Create a transport with the default agent and timeout.
    pub fn new() -> Result<Self> {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT_SECS)
    }

    /// Create a transport with an explicit `User-Agent` and timeout.
    pub fn with_options(user_agent: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            user_agent: user_agent.into(),
            timeout: Duration::from_secs(timeout_secs),
            token: RwLock::new(None),
        })
    }

    /// The currently installed bearer token, if any.
    pub fn bearer_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }

    fn build_headers(&self, extra: &BTreeMap<String, String>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&self.user_agent)?);

        if let Some(token) = self.bearer_token() {
            headers.insert(AUTHORIZATION, header_value(&format!("Bearer {token}"))?);
        }

        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidHeader {
                    reason: format!("invalid header name `{name}`: {e}"),
                }
            })?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
        reason: format!("invalid header value: {e}"),
    })
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: TransportRequest) -> Result<Response> {
        let url = url::Url::parse(&request.url)?;
        let headers = self.build_headers(&request.headers)?;

        debug!(method = %request.method, url = %url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        }
        .headers(headers)
        .timeout(self.timeout);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let response_headers: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let text = response.text().await?;

        let response = Response {
            status,
            headers: response_headers,
            text,
        };

        if response.is_captcha() {
            warn!(url = %request.url, "request blocked by captcha");
            return Err(TransportError::Captcha {
                url: request.url,
                user_agent: self.user_agent.clone(),
            });
        }

        debug!(status = status, url = %request.url, "received response");
        Ok(response)
    }

    fn set_bearer_token(&self, token: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpTransport>();
    }

    #[test]
    fn default_user_agent_is_browser_like() {
        let transport = HttpTransport::new().unwrap();
        assert!(transport.user_agent().starts_with("Mozilla/5.0"));
        assert!(transport.bearer_token().is_none());
    }

    #[test]
    fn bearer_token_roundtrip() {
        let transport = HttpTransport::new().unwrap();
        transport.set_bearer_token(Some("tok".to_string()));
        assert_eq!(transport.bearer_token().as_deref(), Some("tok"));

        let headers = transport.build_headers(&BTreeMap::new()).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");

        transport.set_bearer_token(None);
        let headers = transport.build_headers(&BTreeMap::new()).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn invalid_extra_header_is_rejected() {
        let transport = HttpTransport::new().unwrap();
        let mut extra = BTreeMap::new();
        extra.insert("bad header".to_string(), "x".to_string());
        let result = transport.build_headers(&extra);
        assert!(matches!(result, Err(TransportError::InvalidHeader { .. })));
    }
}
