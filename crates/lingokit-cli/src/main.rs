//! CLI entry point for LingoKit.
//!
//! The `lingokit` binary logs in (reusing a cached session when it can) and
//! prints progress views for the account: learned skills in prerequisite
//! order, known words and topics, dictionary hints and audio URLs.

mod helpers;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::helpers::LoginArgs;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// LingoKit: progress views for a language-learning account.
#[derive(Parser)]
#[command(name = "lingokit", version, about = "LingoKit, a language-learning progress client")]
struct Cli {
    #[command(flatten)]
    login: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Account username.
    #[arg(long, short, env = "LINGOKIT_USER", global = true)]
    user: Option<String>,

    /// Account password, used only when no cached token validates.
    #[arg(long, env = "LINGOKIT_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// A previously issued bearer token.
    #[arg(long, env = "LINGOKIT_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Session cache file.
    #[arg(long, env = "LINGOKIT_SESSION_FILE", global = true)]
    session_file: Option<PathBuf>,

    /// TOML configuration file.
    #[arg(long, env = "LINGOKIT_CONFIG", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show profile, streak and languages.
    Info,

    /// List learned skills in prerequisite order.
    Skills {
        /// Language abbreviation (default: the one being learned).
        #[arg(long)]
        lang: Option<String>,
    },

    /// List the words of every learned skill.
    Words {
        #[arg(long)]
        lang: Option<String>,
    },

    /// List known, golden and reviewable topics.
    Topics {
        #[arg(long)]
        lang: Option<String>,
    },

    /// Look up dictionary hints.
    Translate {
        /// Words to translate.
        #[arg(required = true)]
        words: Vec<String>,

        /// Source language (default: the interface language).
        #[arg(long)]
        from: Option<String>,

        /// Target language (default: the one being learned).
        #[arg(long)]
        to: Option<String>,
    },

    /// Find an audio URL for a word.
    Audio {
        word: String,

        #[arg(long)]
        lang: Option<String>,

        /// Only accept URLs recorded by this voice.
        #[arg(long)]
        voice: Option<String>,

        /// Pick a random URL instead of the first one.
        #[arg(long)]
        random: bool,
    },
}

impl GlobalArgs {
    fn into_login(self) -> Result<LoginArgs> {
        let user = self
            .user
            .ok_or_else(|| anyhow::anyhow!("--user (or LINGOKIT_USER) is required"))?;
        Ok(LoginArgs {
            user,
            password: self.password,
            token: self.token,
            session_file: self.session_file,
            config: self.config,
        })
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    helpers::init_tracing("warn");

    let login = cli.login.into_login()?;
    let lingo = helpers::open_session(&login).await?;
    info!(user = %login.user, "session opened");

    match cli.command {
        Commands::Info => cmd_info(&lingo),
        Commands::Skills { lang } => cmd_skills(&lingo, lang),
        Commands::Words { lang } => cmd_words(&lingo, lang),
        Commands::Topics { lang } => cmd_topics(&lingo, lang),
        Commands::Translate { words, from, to } => cmd_translate(&lingo, words, from, to).await,
        Commands::Audio {
            word,
            lang,
            voice,
            random,
        } => cmd_audio(&lingo, &word, lang, voice, random).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

fn cmd_info(lingo: &lingokit_progress::Lingo) -> Result<()> {
    let info = lingo.user_info();
    let streak = lingo.streak_info();

    println!("{} ({})", info.username, info.fullname.as_deref().unwrap_or("-"));
    println!(
        "streak: {} day(s), daily goal: {}",
        streak.site_streak.unwrap_or(0),
        streak.daily_goal.unwrap_or(0)
    );
    for abbr in lingo.languages(true) {
        let name = lingo.language_from_abbr(&abbr).unwrap_or(&abbr);
        match lingo.language_progress(&abbr) {
            Ok(progress) => println!(
                "  {abbr:<4} {name:<16} level {:>2}  {} XP",
                progress.level, progress.points
            ),
            Err(_) => println!("  {abbr:<4} {name}"),
        }
    }
    Ok(())
}

fn cmd_skills(lingo: &lingokit_progress::Lingo, lang: Option<String>) -> Result<()> {
    let lang = helpers::pick_language(lingo, lang)?;
    for skill in lingo.learned_skills(&lang)? {
        println!(
            "{:>3}  {:<24} {:>3.0}%",
            skill.depth.unwrap_or(0),
            skill.title,
            skill.strength * 100.0
        );
    }
    Ok(())
}

fn cmd_words(lingo: &lingokit_progress::Lingo, lang: Option<String>) -> Result<()> {
    let lang = helpers::pick_language(lingo, lang)?;
    for word in lingo.known_words(&lang)? {
        println!("{word}");
    }
    Ok(())
}

fn cmd_topics(lingo: &lingokit_progress::Lingo, lang: Option<String>) -> Result<()> {
    let lang = helpers::pick_language(lingo, lang)?;
    println!("known:      {}", lingo.known_topics(&lang)?.join(", "));
    println!("golden:     {}", lingo.golden_topics(&lang)?.join(", "));
    println!("reviewable: {}", lingo.reviewable_topics(&lang)?.join(", "));
    println!("unknown:    {}", lingo.unknown_topics(&lang)?.join(", "));
    Ok(())
}

async fn cmd_translate(
    lingo: &lingokit_progress::Lingo,
    words: Vec<String>,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let hints = lingo
        .translations(&words, from.as_deref(), to.as_deref())
        .await?;
    for word in &words {
        match hints.get(word) {
            Some(found) if !found.is_empty() => println!("{word}: {}", found.join(", ")),
            _ => println!("{word}: -"),
        }
    }
    Ok(())
}

async fn cmd_audio(
    lingo: &lingokit_progress::Lingo,
    word: &str,
    lang: Option<String>,
    voice: Option<String>,
    random: bool,
) -> Result<()> {
    let url = lingo
        .audio_url(word, lang.as_deref(), voice.as_deref(), random)
        .await?;
    match url {
        Some(url) => println!("{url}"),
        None => println!("no audio found for {word:?}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
