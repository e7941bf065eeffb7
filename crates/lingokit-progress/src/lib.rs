//! Progress views for LingoKit.
//!
//! [`Lingo`] is the entry point: it authenticates, fetches the user record
//! once and derives views from it. The computational pieces are usable on
//! their own:
//!
//! - **[`SkillGraphOrderer`]**: dependency depth over a skill set, with a
//!   configurable [`CyclePolicy`]
//! - **[`BatchSegmenter`]**: splits word lists for the dictionary endpoint
//! - **[`AudioIndexBuilder`]** / **[`AudioCatalog`]**: crawls lesson
//!   sessions into a word -> audio URL index
//!
//! ```text
//! Lingo
//! ├── CredentialManager   (lingokit-auth)
//! ├── UserData            (typed record)
//! ├── SkillGraphOrderer
//! ├── BatchSegmenter
//! └── AudioCatalog
//!     └── AudioIndexBuilder -> Transport
//! ```

pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod segment;
pub mod skills;

pub use audio::{AudioCatalog, AudioIndex, AudioIndexBuilder, CrawlTarget, LookupOptions};
pub use client::Lingo;
pub use config::{ClientConfig, CyclePolicy};
pub use error::{GraphError, ProgressError, Result};
pub use model::{
    CalendarEvent, Certificate, Friend, LanguageData, LanguageProgress, LanguageSummary,
    LeaderboardEntry, LeaderboardUnit, LexemeEntry, PointsData, RankingEntry, Settings, Skill,
    StreakInfo, UserData, UserInfo, Vocabulary,
};
pub use segment::{BatchSegmenter, MAX_SEGMENT_CHARS, MAX_SEGMENT_ITEMS, segment};
pub use skills::{SENTINEL_DEPTH, SkillGraphOrderer};

pub use lingokit_auth::Credentials;
