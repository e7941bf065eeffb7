//! Audio lexeme index.
//!
//! The service has no "audio for word" endpoint. Instead, lesson sessions
//! carry text-to-speech URLs in several places, and an index is built by
//! crawling one lesson per learned skill:
//!
//! - a challenge's `prompt` with its `tts` URL
//! - `metadata.non_character_tts.tokens`, a `{word: url}` map
//! - `tokens`, arbitrarily nested lists of `{value, tts}` objects
//!
//! [`AudioIndex`] maps a lowercased word to its URLs in first-seen order.
//! [`AudioIndexBuilder`] performs the crawl; [`AudioCatalog`] keeps one
//! index per language and builds it on first lookup.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures::StreamExt;
use lingokit_transport::{Transport, TransportError, TransportRequest};
use rand::seq::SliceRandom;
use serde_json::{Value, json};

use crate::config::DEFAULT_CRAWL_CONCURRENCY;
use crate::error::{ProgressError, Result};

/// Path of the lesson-session endpoint, relative to the service root.
const SESSIONS_PATH: &str = "2017-06-30/sessions";

/// Challenge types requested for each crawled lesson.
const CHALLENGE_TYPES: &[&str] = &[
    "characterIntro",
    "characterMatch",
    "characterSelect",
    "completeReverseTranslation",
    "definition",
    "dialogue",
    "form",
    "gapFill",
    "judge",
    "listen",
    "listenTap",
    "match",
    "name",
    "select",
    "selectPronunciation",
    "selectTranscription",
    "speak",
    "tapComplete",
    "translate",
];

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

/// How to choose among several URLs for one word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOptions {
    /// Only accept URLs containing `/{voice}/`.
    pub voice: Option<String>,
    /// Pick uniformly at random instead of the first URL.
    pub randomize: bool,
}

impl LookupOptions {
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn randomized(mut self, randomize: bool) -> Self {
        self.randomize = randomize;
        self
    }
}

/// Key under which `word` is registered and looked up.
fn normalize_word(word: &str) -> String {
    word.to_lowercase()
}

/// Multi-valued word -> audio URL map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioIndex {
    entries: HashMap<String, Vec<String>>,
}

impl AudioIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from one lesson-session payload.
    pub fn from_lesson(payload: &Value) -> Self {
        let mut index = Self::new();
        index.add_lesson(payload);
        index
    }

    /// Register `url` for `word`. Returns `false` if it was already there.
    pub fn insert(&mut self, word: &str, url: &str) -> bool {
        let word = normalize_word(word);
        if word.is_empty() || url.is_empty() {
            return false;
        }
        let urls = self.entries.entry(word).or_default();
        if urls.iter().any(|u| u == url) {
            return false;
        }
        urls.push(url.to_string());
        true
    }

    /// Number of distinct words.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All URLs for `word`, in first-seen order.
    pub fn urls(&self, word: &str) -> &[String] {
        self.entries
            .get(&normalize_word(word))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Choose one URL for `word`.
    pub fn pick(&self, word: &str, options: &LookupOptions) -> Option<&str> {
        let urls = self.urls(word);
        if let Some(voice) = &options.voice {
            let needle = format!("/{voice}/");
            return urls.iter().find(|u| u.contains(&needle)).map(String::as_str);
        }
        if options.randomize {
            return urls.choose(&mut rand::thread_rng()).map(String::as_str);
        }
        urls.first().map(String::as_str)
    }

    /// Extract every word/URL pair a lesson payload carries.
    pub fn add_lesson(&mut self, payload: &Value) {
        let Some(challenges) = payload.get("challenges").and_then(Value::as_array) else {
            return;
        };
        for challenge in challenges {
            if let (Some(prompt), Some(tts)) = (
                challenge.get("prompt").and_then(Value::as_str),
                challenge.get("tts").and_then(Value::as_str),
            ) {
                self.insert(prompt, tts);
            }

            if let Some(Value::Object(tokens)) = challenge.pointer("/metadata/non_character_tts/tokens")
            {
                for (word, url) in tokens {
                    if let Some(url) = url.as_str() {
                        self.insert(word, url);
                    }
                }
            }

            if let Some(tokens) = challenge.get("tokens") {
                self.add_tokens(tokens);
            }
        }
    }

    fn add_tokens(&mut self, node: &Value) {
        match node {
            Value::Array(items) => {
                for item in items {
                    self.add_tokens(item);
                }
            }
            Value::Object(token) => {
                if let (Some(word), Some(url)) = (
                    token.get("value").and_then(Value::as_str),
                    token.get("tts").and_then(Value::as_str),
                ) {
                    self.insert(word, url);
                }
                if let Some(inner) = token.get("tokens") {
                    self.add_tokens(inner);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// What to crawl for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    /// Abbreviation of the language being learned.
    pub learning_language: String,
    /// Abbreviation of the interface language.
    pub from_language: String,
    /// One lesson is fetched per skill id.
    pub skill_ids: Vec<String>,
}

/// Fetches lesson sessions and folds them into an [`AudioIndex`].
pub struct AudioIndexBuilder {
    transport: Arc<dyn Transport>,
    sessions_url: String,
    concurrency: usize,
}

impl AudioIndexBuilder {
    /// `base_url` is the service root.
    pub fn new(transport: Arc<dyn Transport>, base_url: &str) -> Self {
        Self {
            transport,
            sessions_url: format!("{}/{SESSIONS_PATH}", base_url.trim_end_matches('/')),
            concurrency: DEFAULT_CRAWL_CONCURRENCY,
        }
    }

    /// Set how many lessons are fetched at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Crawl every skill of `target`.
    ///
    /// A skill whose lesson cannot be fetched or decoded is skipped with a
    /// warning. Lessons are merged in skill order, so the first URL of a word
    /// comes from the earliest skill that mentions it.
    ///
    /// # Errors
    ///
    /// A captcha block on any lesson aborts the crawl with
    /// [`AuthError::CaptchaRequired`](lingokit_auth::AuthError::CaptchaRequired).
    pub async fn build(&self, target: &CrawlTarget) -> Result<AudioIndex> {
        let mut lessons = futures::stream::iter(&target.skill_ids)
            .map(|skill_id| self.fetch_lesson(target, skill_id))
            .buffered(self.concurrency);

        let mut index = AudioIndex::new();
        let mut skipped = 0usize;
        while let Some(lesson) = lessons.next().await {
            match lesson? {
                Some(payload) => index.add_lesson(&payload),
                None => skipped += 1,
            }
        }

        tracing::info!(
            language = %target.learning_language,
            skills = target.skill_ids.len(),
            skipped,
            words = index.len(),
            "built audio index"
        );
        Ok(index)
    }

    /// `Ok(None)` means "skip this skill".
    async fn fetch_lesson(&self, target: &CrawlTarget, skill_id: &str) -> Result<Option<Value>> {
        let body = json!({
            "fromLanguage": target.from_language,
            "learningLanguage": target.learning_language,
            "challengeTypes": CHALLENGE_TYPES,
            "skillId": skill_id,
            "type": "LESSON",
            "juicy": true,
        });
        let request = TransportRequest::post(self.sessions_url.clone(), body);

        match self.transport.request(request).await {
            Ok(response) if response.is_success() => match response.json() {
                Ok(payload) => {
                    tracing::debug!(skill_id = %skill_id, "fetched lesson");
                    Ok(Some(payload))
                }
                Err(err) => {
                    tracing::warn!(skill_id = %skill_id, error = %err, "skipping undecodable lesson");
                    Ok(None)
                }
            },
            Ok(response) => {
                tracing::warn!(skill_id = %skill_id, status = response.status, "skipping lesson");
                Ok(None)
            }
            Err(err @ TransportError::Captcha { .. }) => Err(ProgressError::from(err)),
            Err(err) => {
                tracing::warn!(skill_id = %skill_id, error = %err, "skipping lesson");
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// One [`AudioIndex`] per language abbreviation.
#[derive(Debug, Default)]
pub struct AudioCatalog {
    indexes: DashMap<String, Arc<AudioIndex>>,
}

impl AudioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The index for `language`, if it has been built.
    pub fn get(&self, language: &str) -> Option<Arc<AudioIndex>> {
        self.indexes.get(language).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of languages with a built index.
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Return the index for `target`, crawling it first if needed.
    ///
    /// Two concurrent first lookups may both crawl; the first one stored
    /// wins.
    pub async fn index_for(
        &self,
        builder: &AudioIndexBuilder,
        target: &CrawlTarget,
    ) -> Result<Arc<AudioIndex>> {
        if let Some(index) = self.get(&target.learning_language) {
            return Ok(index);
        }
        let built = Arc::new(builder.build(target).await?);
        let stored = self
            .indexes
            .entry(target.learning_language.clone())
            .or_insert(built);
        Ok(Arc::clone(stored.value()))
    }

    /// Look up an audio URL for `word`, building the language's index on
    /// first use. An unknown word is `Ok(None)`.
    pub async fn lookup(
        &self,
        builder: &AudioIndexBuilder,
        target: &CrawlTarget,
        word: &str,
        options: &LookupOptions,
    ) -> Result<Option<String>> {
        let index = self.index_for(builder, target).await?;
        Ok(index.pick(word, options).map(str::to_string))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
