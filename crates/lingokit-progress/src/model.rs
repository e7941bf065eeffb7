//! Typed user-progress records.
//!
//! The profile endpoint returns one large JSON document. It is decoded into
//! [`UserData`] with an explicit optional field per known attribute; anything
//! else lands in the `extra` side-maps so newer fields survive a round trip.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// The user's full progress snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserData {
    pub id: Option<i64>,
    pub username: String,
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar: Option<String>,
    /// Abbreviation of the language currently being learned.
    pub learning_language: Option<String>,
    pub learning_language_string: Option<String>,
    /// Abbreviation of the interface language.
    pub ui_language: Option<String>,
    pub created: Option<String>,
    pub contribution_points: Option<i64>,
    pub site_streak: Option<u32>,
    pub daily_goal: Option<u32>,
    pub streak_extended_today: Option<bool>,
    pub num_followers: Option<u32>,
    pub num_following: Option<u32>,
    /// Comment notification preference, as sent by the service.
    pub notify_comment: Option<Value>,
    pub deactivated: Option<bool>,
    pub is_follower_by: Option<bool>,
    pub is_following: Option<bool>,
    pub certificates: Vec<Certificate>,
    pub languages: Vec<LanguageSummary>,
    /// Detailed data keyed by language abbreviation.
    pub language_data: HashMap<String, LanguageData>,
    pub calendar: Vec<CalendarEvent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of the profile's `languages` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageSummary {
    /// Abbreviation, e.g. `de`.
    pub language: String,
    /// Display name, e.g. `German`.
    pub language_string: String,
    pub learning: bool,
    pub current_learning: bool,
    pub level: u32,
    pub points: i64,
    pub streak: u32,
    pub to_next_level: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Detailed progress for one language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageData {
    pub language: String,
    pub language_string: String,
    pub level: u32,
    pub level_percent: Option<f64>,
    pub level_points: Option<i64>,
    pub level_progress: Option<i64>,
    pub level_left: Option<i64>,
    pub next_level: Option<u32>,
    pub num_skills_learned: Option<u32>,
    pub points: i64,
    pub points_rank: Option<u32>,
    pub streak: u32,
    pub fluency_score: Option<f64>,
    pub skills: Vec<Skill>,
    pub calendar: Vec<CalendarEvent>,
    /// Friends ranked by points in this language.
    pub points_ranking_data: Vec<RankingEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A friend's entry in a language's points ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingEntry {
    pub id: i64,
    pub username: String,
    pub points_data: PointsData,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointsData {
    pub total: i64,
    pub languages: Vec<LanguageSummary>,
}

/// A passed placement or progress test.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certificate {
    pub language: Option<String>,
    pub language_string: String,
    pub score: Option<f64>,
    pub datetime: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A learnable unit with prerequisites.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    pub id: String,
    /// Unique key within a language; dependencies refer to it.
    pub name: String,
    pub title: String,
    pub learned: bool,
    /// Strength in `[0, 1]`; `1.0` is fully golden.
    pub strength: f64,
    /// Names of prerequisite skills, in order.
    pub dependencies_name: Vec<String>,
    pub words: Vec<String>,
    pub language_string: Option<String>,
    pub explanation: Option<String>,
    pub progress_percent: Option<f64>,
    /// Longest prerequisite chain ending here, set by
    /// [`SkillGraphOrderer`](crate::SkillGraphOrderer).
    #[serde(skip)]
    pub depth: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Skill {
    /// A bare skill, mostly useful for tests and graph experiments.
    pub fn new(name: impl Into<String>, dependencies: &[&str]) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            title: name.clone(),
            name,
            dependencies_name: dependencies.iter().map(|d| d.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Mark as learned with the given strength.
    pub fn learned(mut self, strength: f64) -> Self {
        self.learned = true;
        self.strength = strength;
        self
    }
}

/// A practice event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarEvent {
    pub skill_id: Option<String>,
    pub improvement: i64,
    pub event_type: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub datetime: i64,
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Public profile fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInfo {
    pub id: Option<i64>,
    pub username: String,
    pub fullname: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub avatar: Option<String>,
    pub learning_language_string: Option<String>,
    pub ui_language: Option<String>,
    pub created: Option<String>,
    pub contribution_points: Option<i64>,
    pub num_followers: Option<u32>,
    pub num_following: Option<u32>,
}

impl From<&UserData> for UserInfo {
    fn from(user: &UserData) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            fullname: user.fullname.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            avatar: user.avatar.clone(),
            learning_language_string: user.learning_language_string.clone(),
            ui_language: user.ui_language.clone(),
            created: user.created.clone(),
            contribution_points: user.contribution_points,
            num_followers: user.num_followers,
            num_following: user.num_following,
        }
    }
}

/// Streak fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakInfo {
    pub daily_goal: Option<u32>,
    pub site_streak: Option<u32>,
    pub streak_extended_today: Option<bool>,
}

impl From<&UserData> for StreakInfo {
    fn from(user: &UserData) -> Self {
        Self {
            daily_goal: user.daily_goal,
            site_streak: user.site_streak,
            streak_extended_today: user.streak_extended_today,
        }
    }
}

/// Account settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub notify_comment: Option<Value>,
    pub deactivated: Option<bool>,
    pub is_follower_by: Option<bool>,
    pub is_following: Option<bool>,
}

impl From<&UserData> for Settings {
    fn from(user: &UserData) -> Self {
        Self {
            notify_comment: user.notify_comment.clone(),
            deactivated: user.deactivated,
            is_follower_by: user.is_follower_by,
            is_following: user.is_following,
        }
    }
}

/// A friend and their total points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Friend {
    pub id: i64,
    pub username: String,
    pub points: i64,
    /// Display names of the languages the friend has points in.
    pub languages: Vec<String>,
}

impl From<&RankingEntry> for Friend {
    fn from(entry: &RankingEntry) -> Self {
        Self {
            id: entry.id,
            username: entry.username.clone(),
            points: entry.points_data.total,
            languages: entry
                .points_data
                .languages
                .iter()
                .map(|l| l.language_string.clone())
                .collect(),
        }
    }
}

/// Window of a friends leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardUnit {
    Week,
    Month,
}

impl LeaderboardUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::fmt::Display for LeaderboardUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a friends leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub username: String,
    pub points: i64,
    pub unit: LeaderboardUnit,
}

/// Join `friends` with a `ranking` object (`{user id: points}`), highest
/// points first. Friends without a ranking entry are left out.
pub fn rank_friends(
    friends: &[Friend],
    ranking: &Map<String, Value>,
    unit: LeaderboardUnit,
) -> Vec<LeaderboardEntry> {
    let mut rows: Vec<LeaderboardEntry> = friends
        .iter()
        .filter_map(|friend| {
            let points = ranking_points(ranking.get(&friend.id.to_string())?)?;
            Some(LeaderboardEntry {
                id: friend.id,
                username: friend.username.clone(),
                points,
                unit,
            })
        })
        .collect();
    rows.sort_by(|a, b| b.points.cmp(&a.points));
    rows
}

/// Points arrive as numbers or numeric strings.
fn ranking_points(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Level and points for one language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageProgress {
    pub language: String,
    pub language_string: String,
    pub level: u32,
    pub level_percent: Option<f64>,
    pub level_points: Option<i64>,
    pub level_progress: Option<i64>,
    pub level_left: Option<i64>,
    pub next_level: Option<u32>,
    pub num_skills_learned: Option<u32>,
    pub points: i64,
    pub points_rank: Option<u32>,
    pub streak: u32,
    pub fluency_score: Option<f64>,
}

impl From<&LanguageData> for LanguageProgress {
    fn from(data: &LanguageData) -> Self {
        Self {
            language: data.language.clone(),
            language_string: data.language_string.clone(),
            level: data.level,
            level_percent: data.level_percent,
            level_points: data.level_points,
            level_progress: data.level_progress,
            level_left: data.level_left,
            next_level: data.next_level,
            num_skills_learned: data.num_skills_learned,
            points: data.points,
            points_rank: data.points_rank,
            streak: data.streak,
            fluency_score: data.fluency_score,
        }
    }
}

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// The vocabulary overview for the current learning language.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub language_string: String,
    pub learning_language: String,
    pub from_language: String,
    pub vocab_overview: Vec<LexemeEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One lexeme in the vocabulary overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexemeEntry {
    pub lexeme_id: String,
    pub word_string: String,
    pub normalized_string: String,
    pub skill: Option<String>,
    pub strength: Option<f64>,
    pub related_lexemes: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vocabulary {
    /// Lexemes related to `word` (matched on the normalized form).
    pub fn related_to(&self, word: &str) -> Vec<&LexemeEntry> {
        let Some(entry) = self
            .vocab_overview
            .iter()
            .find(|e| e.normalized_string == word)
        else {
            return Vec::new();
        };
        self.vocab_overview
            .iter()
            .filter(|e| entry.related_lexemes.contains(&e.lexeme_id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn user_data_decodes_known_and_unknown_fields() {
        let raw = json!({
            "id": 42,
            "username": "amy",
            "learning_language": "de",
            "ui_language": "en",
            "site_streak": 7,
            "languages": [
                {"language": "de", "language_string": "German", "learning": true, "level": 3, "points": 120, "streak": 7}
            ],
            "language_data": {
                "de": {
                    "language": "de",
                    "language_string": "German",
                    "skills": [
                        {"id": "s1", "name": "Basics 1", "title": "Basics 1", "learned": true,
                         "strength": 1.0, "dependencies_name": [], "words": ["mann", "frau"]}
                    ]
                }
            },
            "brand_new_field": {"nested": true}
        });

        let user: UserData = serde_json::from_value(raw).unwrap();
        assert_eq!(user.id, Some(42));
        assert_eq!(user.site_streak, Some(7));
        assert_eq!(user.languages[0].language_string, "German");
        let skills = &user.language_data["de"].skills;
        assert_eq!(skills[0].words, vec!["mann", "frau"]);
        assert!(skills[0].depth.is_none());
        assert_eq!(user.extra["brand_new_field"]["nested"], true);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let user: UserData = serde_json::from_value(json!({"username": "amy"})).unwrap();
        assert!(user.languages.is_empty());
        assert!(user.language_data.is_empty());
        assert!(user.calendar.is_empty());
        assert!(user.daily_goal.is_none());
    }

    #[test]
    fn views_copy_fields() {
        let user = UserData {
            username: "amy".into(),
            daily_goal: Some(20),
            site_streak: Some(3),
            streak_extended_today: Some(true),
            ..UserData::default()
        };
        let info = UserInfo::from(&user);
        assert_eq!(info.username, "amy");
        let streak = StreakInfo::from(&user);
        assert_eq!(streak.daily_goal, Some(20));
        assert_eq!(streak.streak_extended_today, Some(true));
    }

    #[test]
    fn settings_and_certificates_decode() {
        let user: UserData = serde_json::from_value(json!({
            "username": "amy",
            "notify_comment": "instant",
            "deactivated": false,
            "is_following": true,
            "certificates": [
                {"language": "de", "language_string": "German", "score": 3.2, "datetime": " 2015-07-06 05:42:24 "}
            ]
        }))
        .unwrap();

        let settings = Settings::from(&user);
        assert_eq!(settings.notify_comment, Some(json!("instant")));
        assert_eq!(settings.deactivated, Some(false));
        assert_eq!(settings.is_following, Some(true));
        assert!(settings.is_follower_by.is_none());
        assert_eq!(user.certificates[0].score, Some(3.2));
        assert!(!user.extra.contains_key("certificates"));
    }

    #[test]
    fn friend_from_ranking_entry() {
        let entry: RankingEntry = serde_json::from_value(json!({
            "id": 11,
            "username": "bob",
            "points_data": {
                "total": 1200,
                "languages": [{"language": "de", "language_string": "German"}, {"language_string": "French"}]
            }
        }))
        .unwrap();

        let friend = Friend::from(&entry);
        assert_eq!(friend.id, 11);
        assert_eq!(friend.points, 1200);
        assert_eq!(friend.languages, vec!["German", "French"]);
    }

    #[test]
    fn rank_friends_sorts_descending_and_drops_unranked() {
        let friend = |id: i64, name: &str| Friend {
            id,
            username: name.to_string(),
            points: 0,
            languages: Vec::new(),
        };
        let friends = vec![friend(1, "amy"), friend(2, "bob"), friend(3, "cy"), friend(4, "dee")];
        let ranking = json!({"1": 40, "2": "90", "4": 40, "99": 500});
        let ranking = ranking.as_object().unwrap();

        let rows = rank_friends(&friends, ranking, LeaderboardUnit::Week);
        let names: Vec<&str> = rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["bob", "amy", "dee"]);
        assert_eq!(rows[0].points, 90);
        assert!(rows.iter().all(|r| r.unit == LeaderboardUnit::Week));
        assert_eq!(LeaderboardUnit::Month.to_string(), "month");
    }

    #[test]
    fn related_lexemes_resolve_by_id() {
        let vocab: Vocabulary = serde_json::from_value(json!({
            "language_string": "German",
            "learning_language": "de",
            "from_language": "en",
            "vocab_overview": [
                {"lexeme_id": "l1", "word_string": "Mann", "normalized_string": "mann", "related_lexemes": ["l2"]},
                {"lexeme_id": "l2", "word_string": "Männer", "normalized_string": "männer", "related_lexemes": ["l1"]},
                {"lexeme_id": "l3", "word_string": "Frau", "normalized_string": "frau", "related_lexemes": []}
            ]
        }))
        .unwrap();

        let related = vocab.related_to("mann");
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].lexeme_id, "l2");
        assert!(vocab.related_to("hund").is_empty());
    }
}
