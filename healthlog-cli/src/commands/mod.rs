//! CLI command implementations

pub mod bmi;
pub mod doctor;
pub mod login;
pub mod logs;
pub mod post;
pub mod signup;
pub mod status;
pub mod user;

use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{anyhow, Context, Result};
use dialoguer::Password;
use healthlog_core::ports::UserFilter;
use healthlog_core::{EntryPoint, Error, HealthlogContext, LogEvent, LoggingService, Session, User};

static LOGGER: OnceLock<Option<LoggingService>> = OnceLock::new();

/// Get the logging service for CLI operations
///
/// Opened once per process. Returns None if logging fails to initialize
/// (shouldn't block operations)
pub fn get_logger() -> Option<&'static LoggingService> {
    LOGGER
        .get_or_init(|| {
            let data_dir = get_data_dir().ok()?;
            std::fs::create_dir_all(&data_dir).ok()?;
            LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
        })
        .as_ref()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(event: LogEvent) {
    if let Some(l) = get_logger() {
        let _ = l.log(event);
    }
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("HEALTHLOG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".healthlog"))
        .context("Could not find home directory; set HEALTHLOG_DIR")
}

/// Get or create the healthlog context
pub fn get_context() -> Result<HealthlogContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    HealthlogContext::new(&data_dir).context("Failed to initialize healthlog context")
}

/// Resolve a password from the flag, `HEALTHLOG_PASSWORD`, or a prompt
pub fn get_password(flag: Option<String>, prompt: &str) -> Result<String> {
    if let Some(p) = flag {
        return Ok(p);
    }
    if let Ok(p) = std::env::var("HEALTHLOG_PASSWORD") {
        return Ok(p);
    }
    Ok(Password::new().with_prompt(prompt).interact()?)
}

/// Like `get_password`, but an interactive prompt asks twice
pub fn get_new_password(flag: Option<String>, prompt: &str) -> Result<String> {
    if flag.is_some() || std::env::var("HEALTHLOG_PASSWORD").is_ok() {
        return get_password(flag, prompt);
    }
    Ok(Password::new()
        .with_prompt(prompt)
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()?)
}

/// Find a user by numeric id or username
pub fn resolve_user(ctx: &HealthlogContext, session: &Session, key: &str) -> Result<User> {
    let filter = match key.parse::<i64>() {
        Ok(id) => UserFilter::Id(id),
        Err(_) => UserFilter::Username(key.to_string()),
    };
    ctx.users
        .find(session, &filter)?
        .ok_or_else(|| anyhow!("User '{}' not found", key))
}

/// Turn a failed commit into a message fit for the terminal
pub fn commit_error(err: Error) -> anyhow::Error {
    match err {
        Error::UniqueViolation { field } if field == "username" || field == "email" => {
            anyhow!("That {} is already taken", field)
        }
        Error::UniqueViolation { .. } => anyhow!("That value is already taken"),
        Error::NotNullViolation { field } => anyhow!("Missing required field: {}", field),
        Error::ForeignKeyViolation(_) => anyhow!("Referenced user does not exist"),
        other => anyhow::Error::new(other).context("Failed to save changes"),
    }
}
