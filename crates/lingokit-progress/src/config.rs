//! Client configuration.
//!
//! [`ClientConfig`] carries the service endpoints, the transport settings
//! and the policy knobs of the progress views. Defaults target the public
//! service; a builder-style API and TOML loading cover the rest.

use std::path::{Path, PathBuf};

use lingokit_transport::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::error::{ProgressError, Result};

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "https://www.duolingo.com";

/// Default dictionary-hints endpoint.
pub const DEFAULT_DICTIONARY_URL: &str = "https://d2.duolingo.com/api/1/dictionary/hints";

/// Default number of lesson fetches in flight while crawling audio.
pub const DEFAULT_CRAWL_CONCURRENCY: usize = 4;

/// What to do when the skill dependency graph has a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Stop and report [`GraphError::CycleDetected`](crate::GraphError::CycleDetected).
    #[default]
    Abort,
    /// Give the repeated skill depth `0` and keep going.
    Sentinel,
}

/// Settings for a [`Lingo`](crate::Lingo) session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service root, without a trailing slash.
    ///
    /// Default: **`https://www.duolingo.com`**.
    pub base_url: String,

    /// Dictionary-hints endpoint used for translations.
    pub dictionary_url: String,

    /// `User-Agent` sent on every request. This is the header to change
    /// after a captcha block.
    pub user_agent: String,

    /// Per-request timeout in seconds.
    ///
    /// Default: **30**.
    pub timeout_secs: u64,

    /// Lesson fetches in flight while building an audio index.
    ///
    /// Default: **4**.
    pub crawl_concurrency: usize,

    /// Cycle handling for skill ordering.
    ///
    /// Default: **abort**.
    pub cycle_policy: CyclePolicy,

    /// Where to cache the bearer token between runs.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            dictionary_url: DEFAULT_DICTIONARY_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            crawl_concurrency: DEFAULT_CRAWL_CONCURRENCY,
            cycle_policy: CyclePolicy::default(),
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ProgressError::Config {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Io`] if the file cannot be read, otherwise
    /// as [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.crawl_concurrency == 0 {
            return Err(ProgressError::Config {
                reason: "crawl_concurrency must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ProgressError::Config {
                reason: "timeout_secs must be at least 1".to_string(),
            });
        }
        if self.base_url.is_empty() {
            return Err(ProgressError::Config {
                reason: "base_url must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Set the service root.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the dictionary-hints endpoint.
    pub fn with_dictionary_url(mut self, url: impl Into<String>) -> Self {
        self.dictionary_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the `User-Agent`.
    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set the request timeout (in seconds).
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the crawl fan-out.
    pub fn with_crawl_concurrency(mut self, n: usize) -> Self {
        self.crawl_concurrency = n;
        self
    }

    /// Set the cycle policy.
    pub fn with_cycle_policy(mut self, policy: CyclePolicy) -> Self {
        self.cycle_policy = policy;
        self
    }

    /// Set the session cache file.
    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.dictionary_url, DEFAULT_DICTIONARY_URL);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.crawl_concurrency, 4);
        assert_eq!(cfg.cycle_policy, CyclePolicy::Abort);
        assert!(cfg.session_file.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builder_chaining() {
        let cfg = ClientConfig::new()
            .with_base_url("http://localhost:9000/")
            .with_user_agent("ua/2")
            .with_timeout_secs(5)
            .with_crawl_concurrency(8)
            .with_cycle_policy(CyclePolicy::Sentinel)
            .with_session_file("/tmp/s.json");
        assert_eq!(cfg.base_url, "http://localhost:9000");
        assert_eq!(cfg.user_agent, "ua/2");
        assert_eq!(cfg.timeout_secs, 5);
        assert_eq!(cfg.crawl_concurrency, 8);
        assert_eq!(cfg.cycle_policy, CyclePolicy::Sentinel);
        assert_eq!(cfg.session_file, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn toml_partial_keeps_defaults() {
        let cfg = ClientConfig::from_toml_str(
            r#"
            user_agent = "custom/1.0"
            cycle_policy = "sentinel"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.user_agent, "custom/1.0");
        assert_eq!(cfg.cycle_policy, CyclePolicy::Sentinel);
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.crawl_concurrency, DEFAULT_CRAWL_CONCURRENCY);
    }

    #[test]
    fn toml_rejects_zero_concurrency() {
        let result = ClientConfig::from_toml_str("crawl_concurrency = 0");
        assert!(matches!(result, Err(ProgressError::Config { .. })));
    }

    #[test]
    fn toml_rejects_unknown_policy() {
        let result = ClientConfig::from_toml_str(r#"cycle_policy = "ignore""#);
        assert!(matches!(result, Err(ProgressError::Config { .. })));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lingokit.toml");
        std::fs::write(&path, "timeout_secs = 12\nsession_file = \"s.json\"\n").unwrap();

        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.timeout_secs, 12);
        assert_eq!(cfg.session_file, Some(PathBuf::from("s.json")));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = ClientConfig::load("/definitely/not/here.toml");
        assert!(matches!(result, Err(ProgressError::Io(_))));
    }
}
