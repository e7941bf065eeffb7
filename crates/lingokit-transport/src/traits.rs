//! Core transport trait and supporting types.
//!
//! Every component that talks to the remote service goes through the
//! [`Transport`] trait. The HTTP implementation lives in
//! [`crate::http::HttpTransport`]; tests substitute scripted fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Marker the remote embeds in a response body when it wants a captcha.
pub const CAPTCHA_MARKER: &str = "blockScript";

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// HTTP method used by the client. Only the two the service needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Idempotent read.
    Get,
    /// JSON submission.
    Post,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: Method,
    /// Absolute request URL (without the query string).
    pub url: String,
    /// Optional JSON body, sent with `Content-Type: application/json`.
    pub json_body: Option<Value>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
}

impl TransportRequest {
    /// Build a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            json_body: None,
            headers: BTreeMap::new(),
            query: Vec::new(),
        }
    }

    /// Build a `POST` request carrying `body` as JSON.
    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            json_body: Some(body),
            headers: BTreeMap::new(),
            query: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set an extra header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// A fully read response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers with lowercase names.
    pub headers: BTreeMap<String, String>,
    /// The raw body text.
    pub text: String,
}

impl Response {
    /// Create a response from its parts.
    pub fn new(status: u16, text: impl Into<String>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            text: text.into(),
        }
    }

    /// Attach a header (name is lowercased).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the body carries the captcha marker.
    pub fn is_captcha(&self) -> bool {
        self.text.contains(CAPTCHA_MARKER)
    }

    /// Parse the body as a generic JSON value.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.text)?)
    }

    /// Parse the body into a typed value.
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.text)?)
    }
}

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// The API transport collaborator.
///
/// Implementations attach the bearer token (once set) to every request and
/// fail with [`TransportError::Captcha`](crate::TransportError::Captcha)
/// whenever a response carries [`CAPTCHA_MARKER`]. Non-2xx statuses are
/// returned as ordinary responses; interpreting them is the caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and read the full response.
    async fn request(&self, request: TransportRequest) -> Result<Response>;

    /// Install (or clear) the bearer token sent on subsequent requests.
    fn set_bearer_token(&self, token: Option<String>);

    /// The `User-Agent` this transport identifies itself with.
    fn user_agent(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
