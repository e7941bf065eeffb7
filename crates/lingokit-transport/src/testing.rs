//! Scripted in-memory transport for tests.
//!
//! Enabled with the `test-util` feature. Routes are matched on method and
//! URL (without query string); the first matching route answers. Every
//! request is recorded together with the bearer token that was installed
//! when it was sent.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, TransportError};
use crate::traits::{Method, Response, Transport, TransportRequest};

type Handler = Arc<dyn Fn(&TransportRequest) -> Result<Response> + Send + Sync>;

/// A request as seen by [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The request itself.
    pub request: TransportRequest,
    /// The bearer token installed at send time.
    pub bearer_token: Option<String>,
}

/// A [`Transport`] that answers from a script instead of the network.
pub struct ScriptedTransport {
    user_agent: String,
    routes: Mutex<Vec<(Method, String, Handler)>>,
    log: Mutex<Vec<RecordedRequest>>,
    token: Mutex<Option<String>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Create an empty script. Unmatched requests get a `404`.
    pub fn new() -> Self {
        Self {
            user_agent: "scripted-agent/1.0".to_string(),
            routes: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
            token: Mutex::new(None),
        }
    }

    /// Always answer `method url` with a clone of `response`.
    pub fn respond(&self, method: Method, url: impl Into<String>, response: Response) {
        self.respond_with(method, url, move |_| Ok(response.clone()));
    }

    /// Answer `method url` by calling `handler`.
    pub fn respond_with<F>(&self, method: Method, url: impl Into<String>, handler: F)
    where
        F: Fn(&TransportRequest) -> Result<Response> + Send + Sync + 'static,
    {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push((method, url.into(), Arc::new(handler)));
        }
    }

    /// Answer `method url` with the captcha block.
    pub fn captcha(&self, method: Method, url: impl Into<String>) {
        let user_agent = self.user_agent.clone();
        self.respond_with(method, url, move |req| {
            Err(TransportError::Captcha {
                url: req.url.clone(),
                user_agent: user_agent.clone(),
            })
        });
    }

    /// Snapshot of every request sent so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of requests sent to `method url`.
    pub fn count(&self, method: Method, url: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.request.method == method && r.request.url == url)
            .count()
    }

    /// The bearer token currently installed.
    pub fn bearer_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|t| t.clone())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(&self, request: TransportRequest) -> Result<Response> {
        let bearer_token = self.bearer_token();
        if let Ok(mut log) = self.log.lock() {
            log.push(RecordedRequest {
                request: request.clone(),
                bearer_token,
            });
        }

        let handler = self.routes.lock().ok().and_then(|routes| {
            routes
                .iter()
                .find(|(method, url, _)| *method == request.method && *url == request.url)
                .map(|(_, _, handler)| Arc::clone(handler))
        });

        match handler {
            Some(handler) => handler(&request),
            None => Ok(Response::new(404, "")),
        }
    }

    fn set_bearer_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.lock() {
            *guard = token;
        }
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
