//! The [`Lingo`] session facade.
//!
//! A `Lingo` value is one authenticated session: it resolves a bearer token
//! through the [`CredentialManager`], fetches the user record once and
//! answers the progress views from it. Translations and audio lookups make
//! further authenticated requests through the same transport.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use lingokit_auth::{BearerToken, CredentialManager, Credentials};
use lingokit_transport::{HttpTransport, Transport, TransportError, TransportRequest};
use serde_json::{Value, json};

use crate::audio::{AudioCatalog, AudioIndexBuilder, CrawlTarget, LookupOptions};
use crate::config::ClientConfig;
use crate::error::{ProgressError, Result};
use crate::model::{
    CalendarEvent, Certificate, Friend, LanguageData, LanguageProgress, LanguageSummary,
    LeaderboardEntry, LeaderboardUnit, LexemeEntry, Settings, Skill, StreakInfo, UserData,
    UserInfo, Vocabulary, rank_friends,
};
use crate::segment::BatchSegmenter;
use crate::skills::SkillGraphOrderer;

/// An authenticated session over one user's progress.
pub struct Lingo {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    auth: CredentialManager,
    token: BearerToken,
    user: UserData,
    orderer: SkillGraphOrderer,
    segmenter: BatchSegmenter,
    audio_builder: AudioIndexBuilder,
    audio: AudioCatalog,
}

impl std::fmt::Debug for Lingo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lingo")
            .field("user", &self.user.username)
            .field("base_url", &self.config.base_url)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl Lingo {
    /// Log in over HTTP and fetch the user record.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`](lingokit_auth::AuthError) from authentication,
    /// [`ProgressError::UserNotFound`] if the profile does not exist,
    /// [`ProgressError::Config`] for an invalid configuration.
    pub async fn login(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::with_options(config.user_agent.clone(), config.timeout_secs)?;
        Self::with_transport(config, credentials, Arc::new(transport)).await
    }

    /// Same as [`login`](Self::login) over an injected transport.
    pub async fn with_transport(
        config: ClientConfig,
        mut credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        if credentials.session_file.is_none() {
            credentials.session_file = config.session_file.clone();
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let auth = CredentialManager::new(Arc::clone(&transport), base_url.clone(), credentials);
        let token = auth.authenticate().await?;
        let user = fetch_user(transport.as_ref(), &base_url, auth.identifier()).await?;

        tracing::info!(
            user = %auth.identifier(),
            source = ?token.source(),
            languages = user.language_data.len(),
            "session ready"
        );

        let audio_builder = AudioIndexBuilder::new(Arc::clone(&transport), &base_url)
            .with_concurrency(config.crawl_concurrency);

        Ok(Self {
            orderer: SkillGraphOrderer::new(config.cycle_policy),
            segmenter: BatchSegmenter::default(),
            audio_builder,
            audio: AudioCatalog::new(),
            config,
            transport,
            auth,
            token,
            user,
        })
    }

    // -- Accessors ----------------------------------------------------------

    /// The bearer token in use.
    pub fn token(&self) -> &str {
        self.token.as_str()
    }

    /// The raw user record.
    pub fn user(&self) -> &UserData {
        &self.user
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The cached audio indexes.
    pub fn audio_catalog(&self) -> &AudioCatalog {
        &self.audio
    }

    // -- Profile views ------------------------------------------------------

    /// Languages being learned, as display names or abbreviations.
    pub fn languages(&self, abbreviations: bool) -> Vec<String> {
        self.user
            .languages
            .iter()
            .filter(|l| l.learning)
            .map(|l| {
                if abbreviations {
                    l.language.clone()
                } else {
                    l.language_string.clone()
                }
            })
            .collect()
    }

    /// Display name for an abbreviation.
    pub fn language_from_abbr(&self, abbr: &str) -> Option<&str> {
        self.user
            .languages
            .iter()
            .find(|l| l.language == abbr)
            .map(|l| l.language_string.as_str())
    }

    /// Abbreviation for a display name.
    pub fn abbreviation_of(&self, name: &str) -> Option<&str> {
        self.user
            .languages
            .iter()
            .find(|l| l.language_string == name)
            .map(|l| l.language.as_str())
    }

    /// Summary entry for a language, by display name.
    pub fn language_details(&self, name: &str) -> Option<&LanguageSummary> {
        self.user.languages.iter().find(|l| l.language_string == name)
    }

    pub fn user_info(&self) -> UserInfo {
        UserInfo::from(&self.user)
    }

    pub fn streak_info(&self) -> StreakInfo {
        StreakInfo::from(&self.user)
    }

    /// Detailed data for `abbr`.
    pub fn language_data(&self, abbr: &str) -> Result<&LanguageData> {
        self.user
            .language_data
            .get(abbr)
            .ok_or_else(|| ProgressError::UnknownLanguage {
                abbr: abbr.to_string(),
            })
    }

    pub fn language_progress(&self, abbr: &str) -> Result<LanguageProgress> {
        self.language_data(abbr).map(LanguageProgress::from)
    }

    /// Practice events for `abbr`, or the profile-wide calendar.
    pub fn calendar(&self, abbr: Option<&str>) -> Result<&[CalendarEvent]> {
        match abbr {
            Some(abbr) => Ok(&self.language_data(abbr)?.calendar),
            None => Ok(&self.user.calendar),
        }
    }

    pub fn settings(&self) -> Settings {
        Settings::from(&self.user)
    }

    /// Certificates with their timestamps trimmed.
    pub fn certificates(&self) -> Vec<Certificate> {
        self.user
            .certificates
            .iter()
            .map(|c| Certificate {
                datetime: c.datetime.trim().to_string(),
                ..c.clone()
            })
            .collect()
    }

    /// Friends from the points ranking of the current learning language.
    pub fn friends(&self) -> Vec<Friend> {
        self.user
            .learning_language
            .as_deref()
            .and_then(|abbr| self.user.language_data.get(abbr))
            .map(|data| data.points_ranking_data.iter().map(Friend::from).collect())
            .unwrap_or_default()
    }

    // -- Skill views --------------------------------------------------------

    /// Words of every learned skill.
    pub fn known_words(&self, abbr: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .skills(abbr)?
            .iter()
            .filter(|s| s.learned)
            .flat_map(|s| s.words.iter().cloned())
            .collect())
    }

    /// Titles of learned skills.
    pub fn known_topics(&self, abbr: &str) -> Result<Vec<String>> {
        self.topics(abbr, |s| s.learned)
    }

    /// Titles of skills not yet learned.
    pub fn unknown_topics(&self, abbr: &str) -> Result<Vec<String>> {
        self.topics(abbr, |s| !s.learned)
    }

    /// Titles of learned skills at full strength.
    pub fn golden_topics(&self, abbr: &str) -> Result<Vec<String>> {
        self.topics(abbr, |s| s.learned && s.strength >= 1.0)
    }

    /// Titles of learned skills that have decayed.
    pub fn reviewable_topics(&self, abbr: &str) -> Result<Vec<String>> {
        self.topics(abbr, |s| s.learned && s.strength < 1.0)
    }

    /// Learned skills in prerequisite order, each carrying its depth.
    ///
    /// # Errors
    ///
    /// [`ProgressError::Graph`] on a dangling dependency, or on a cycle
    /// under [`CyclePolicy::Abort`](crate::CyclePolicy::Abort).
    pub fn learned_skills(&self, abbr: &str) -> Result<Vec<Skill>> {
        Ok(self.orderer.learned_in_order(self.skills(abbr)?)?)
    }

    fn skills(&self, abbr: &str) -> Result<&[Skill]> {
        Ok(&self.language_data(abbr)?.skills)
    }

    fn topics(&self, abbr: &str, keep: impl Fn(&Skill) -> bool) -> Result<Vec<String>> {
        Ok(self
            .skills(abbr)?
            .iter()
            .filter(|s| keep(s))
            .map(|s| s.title.clone())
            .collect())
    }

    // -- Remote views -------------------------------------------------------

    /// Dictionary hints for `words`.
    ///
    /// `source` defaults to the interface language and `target` to the
    /// learning language. Long lists are split with [`BatchSegmenter`] and
    /// sent as one request per segment; the results are merged.
    pub async fn translations<S: AsRef<str>>(
        &self,
        words: &[S],
        source: Option<&str>,
        target: Option<&str>,
    ) -> Result<HashMap<String, Vec<String>>> {
        let source = match source {
            Some(source) => source.to_string(),
            None => self.ui_language()?,
        };
        let target = match target {
            Some(target) => target.to_string(),
            None => self.learning_language()?,
        };
        let url = format!(
            "{}/{target}/{source}",
            self.config.dictionary_url.trim_end_matches('/')
        );

        let mut merged = HashMap::new();
        for segment in self.segmenter.segment(words) {
            if segment.is_empty() {
                continue;
            }
            let tokens = serde_json::to_string(&segment).map_err(TransportError::from)?;
            let request = TransportRequest::get(url.clone()).with_query("tokens", tokens);
            let response = self.transport.request(request).await?;
            if !response.is_success() {
                return Err(TransportError::Status {
                    status: response.status,
                    url: url.clone(),
                }
                .into());
            }
            let hints: HashMap<String, Vec<String>> = response.json_as()?;
            tracing::debug!(words = segment.len(), hints = hints.len(), "fetched translations");
            merged.extend(hints);
        }
        Ok(merged)
    }

    /// An audio URL for `word`.
    ///
    /// `abbr` defaults to the learning language. The first call for a
    /// language crawls one lesson per learned skill; later calls reuse the
    /// index.
    pub async fn audio_url(
        &self,
        word: &str,
        abbr: Option<&str>,
        voice: Option<&str>,
        randomize: bool,
    ) -> Result<Option<String>> {
        let language = match abbr {
            Some(abbr) => abbr.to_string(),
            None => self.learning_language()?,
        };
        let options = LookupOptions {
            voice: voice.map(str::to_string),
            randomize,
        };

        if let Some(index) = self.audio.get(&language) {
            return Ok(index.pick(word, &options).map(str::to_string));
        }

        let target = self.crawl_target(language)?;
        self.audio
            .lookup(&self.audio_builder, &target, word, &options)
            .await
    }

    /// One lesson per learned skill of `language`.
    fn crawl_target(&self, language: String) -> Result<CrawlTarget> {
        let skill_ids = self
            .skills(&language)?
            .iter()
            .filter(|s| s.learned && !s.id.is_empty())
            .map(|s| s.id.clone())
            .collect();
        Ok(CrawlTarget {
            learning_language: language,
            from_language: self.ui_language()?,
            skill_ids,
        })
    }

    /// Friends ranked by points earned in the window ending at `before`.
    ///
    /// # Errors
    ///
    /// [`TransportError::Status`] for a non-success response.
    pub async fn leaderboard(
        &self,
        unit: LeaderboardUnit,
        before: &str,
    ) -> Result<Vec<LeaderboardEntry>> {
        let url = format!("{}/friendships/leaderboard_activity", self.base_url());
        let request = TransportRequest::get(url.clone())
            .with_query("unit", unit.as_str())
            .with_query("_", before);
        let response = self.transport.request(request).await?;
        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                url,
            }
            .into());
        }

        let payload = response.json()?;
        let ranking = payload
            .get("ranking")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let rows = rank_friends(&self.friends(), &ranking, unit);
        tracing::debug!(unit = %unit, rows = rows.len(), "fetched leaderboard");
        Ok(rows)
    }

    // -- Remote state -------------------------------------------------------

    /// Re-fetch the user record.
    pub async fn reload(&mut self) -> Result<()> {
        self.user = fetch_user(self.transport.as_ref(), self.base_url(), self.auth.identifier()).await?;
        Ok(())
    }

    /// Make `abbr` the current learning language and reload the record.
    ///
    /// # Errors
    ///
    /// [`ProgressError::UnknownLanguage`] if the service does not confirm
    /// the switch.
    pub async fn switch_language(&mut self, abbr: &str) -> Result<()> {
        let url = format!("{}/switch_language", self.base_url());
        let body = json!({ "learning_language": abbr });
        let response = self.transport.request(TransportRequest::post(url, body)).await?;

        let confirmed = response.is_success()
            && response
                .json()
                .ok()
                .and_then(|payload| {
                    payload
                        .pointer("/tracking_properties/learning_language")
                        .and_then(Value::as_str)
                        .map(|lang| lang == abbr)
                })
                .unwrap_or(false);
        if !confirmed {
            return Err(ProgressError::UnknownLanguage {
                abbr: abbr.to_string(),
            });
        }

        tracing::info!(language = %abbr, "switched learning language");
        self.reload().await
    }

    /// The vocabulary overview, switching language first if `abbr` is not
    /// in the record.
    pub async fn vocabulary(&mut self, abbr: Option<&str>) -> Result<Vocabulary> {
        if let Some(abbr) = abbr {
            if !self.user.language_data.contains_key(abbr) {
                self.switch_language(abbr).await?;
            }
        }

        let url = format!("{}/vocabulary/overview", self.base_url());
        let response = self.transport.request(TransportRequest::get(url.clone())).await?;
        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                url,
            }
            .into());
        }
        Ok(response.json_as()?)
    }

    /// Lexemes related to `word` in the vocabulary overview.
    pub async fn related_words(&mut self, word: &str, abbr: Option<&str>) -> Result<Vec<LexemeEntry>> {
        let vocabulary = self.vocabulary(abbr).await?;
        Ok(vocabulary.related_to(word).into_iter().cloned().collect())
    }

    // -- Internal helpers ---------------------------------------------------

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn learning_language(&self) -> Result<String> {
        self.user
            .learning_language
            .clone()
            .ok_or(ProgressError::MissingField {
                field: "learning_language",
            })
    }

    fn ui_language(&self) -> Result<String> {
        self.user
            .ui_language
            .clone()
            .ok_or(ProgressError::MissingField {
                field: "ui_language",
            })
    }
}

/// `GET {base}/users/{identifier}`.
async fn fetch_user(transport: &dyn Transport, base_url: &str, identifier: &str) -> Result<UserData> {
    let url = format!("{base_url}/users/{identifier}");
    let response = transport.request(TransportRequest::get(url.clone())).await?;

    match response.status {
        404 => Err(ProgressError::UserNotFound {
            identifier: identifier.to_string(),
        }),
        status if !response.is_success() => Err(TransportError::Status { status, url }.into()),
        _ => {
            let user: UserData = response.json_as()?;
            tracing::debug!(user = %identifier, "fetched user record");
            Ok(user)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
