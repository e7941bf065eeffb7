//! Shared helpers for the CLI: tracing setup and session construction.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lingokit_auth::Credentials;
use lingokit_progress::{ClientConfig, Lingo};
use tracing_subscriber::EnvFilter;

/// Default location of the session cache, relative to the working directory.
pub const DEFAULT_SESSION_FILE: &str = "data/session.json";

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with an env-filter fallback.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Where credentials come from on the command line.
#[derive(Debug, Clone, Default)]
pub struct LoginArgs {
    pub user: String,
    pub password: Option<String>,
    pub token: Option<String>,
    pub session_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Load the config file if one was given, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> Result<ClientConfig> {
    match path {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ClientConfig::default()),
    }
}

/// Build the credentials, falling back to the configured or default
/// session file.
pub fn credentials(args: &LoginArgs, config: &ClientConfig) -> Credentials {
    let mut credentials = Credentials::new(args.user.clone());
    if let Some(password) = &args.password {
        credentials = credentials.with_secret(password.clone());
    }
    if let Some(token) = &args.token {
        credentials = credentials.with_token(token.clone());
    }
    let session_file = args
        .session_file
        .clone()
        .or_else(|| config.session_file.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));
    credentials.with_session_file(session_file)
}

/// Authenticate and fetch the user record.
pub async fn open_session(args: &LoginArgs) -> Result<Lingo> {
    let config = load_config(args.config.as_deref())?;
    let credentials = credentials(args, &config);
    Lingo::login(config, credentials)
        .await
        .with_context(|| format!("failed to open a session for {}", args.user))
}

/// The language to act on: the explicit one, or the one being learned.
pub fn pick_language(lingo: &Lingo, lang: Option<String>) -> Result<String> {
    lang.or_else(|| lingo.user().learning_language.clone())
        .context("no language given and the profile has no learning language")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_file_precedence() {
        let config = ClientConfig::default().with_session_file("from-config.json");

        let explicit = LoginArgs {
            user: "amy".into(),
            session_file: Some(PathBuf::from("explicit.json")),
            ..LoginArgs::default()
        };
        assert_eq!(
            credentials(&explicit, &config).session_file,
            Some(PathBuf::from("explicit.json"))
        );

        let configured = LoginArgs {
            user: "amy".into(),
            ..LoginArgs::default()
        };
        assert_eq!(
            credentials(&configured, &config).session_file,
            Some(PathBuf::from("from-config.json"))
        );

        assert_eq!(
            credentials(&configured, &ClientConfig::default()).session_file,
            Some(PathBuf::from(DEFAULT_SESSION_FILE))
        );
    }

    #[test]
    fn credentials_carry_secret_and_token() {
        let args = LoginArgs {
            user: "amy".into(),
            password: Some("pw".into()),
            token: Some("tok".into()),
            ..LoginArgs::default()
        };
        let creds = credentials(&args, &ClientConfig::default());
        assert_eq!(creds.identifier, "amy");
        assert_eq!(creds.secret.as_deref(), Some("pw"));
        assert_eq!(creds.token.as_deref(), Some("tok"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lingokit.toml");
        std::fs::write(&path, "crawl_concurrency = 2\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.crawl_concurrency, 2);
        assert_eq!(load_config(None).unwrap(), ClientConfig::default());
        assert!(load_config(Some(Path::new("/no/such/file.toml"))).is_err());
    }
}
