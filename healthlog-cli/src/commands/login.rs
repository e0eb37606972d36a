//! Login command - check a username and password

use anyhow::{bail, Result};
use colored::Colorize;
use healthlog_core::{AuthOutcome, LogEvent};

use super::{get_context, get_password, log_event};

pub fn run(username: &str, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let password = get_password(password, "Password")?;

    let session = ctx.session();
    match ctx.users.authenticate(&session, username, &password)? {
        AuthOutcome::Authenticated(user) => {
            log_event(LogEvent::new("login_succeeded").with_entity("user").with_command("login"));
            if json {
                println!("{}", serde_json::to_string_pretty(&user)?);
            } else {
                println!("{} Logged in as {} ({})", "✓".green(), user.username.bold(), user.full_name());
            }
            Ok(())
        }
        AuthOutcome::NoMatch => {
            log_event(LogEvent::new("login_failed").with_entity("user").with_command("login"));
            bail!("Invalid username or password")
        }
    }
}
