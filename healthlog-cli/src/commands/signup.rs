//! Signup command - create a new account

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use dialoguer::Input;
use healthlog_core::{LogEvent, SignupRequest};

use super::{commit_error, get_context, get_new_password, log_event};

#[derive(Args)]
pub struct SignupArgs {
    /// Username (prompted if omitted)
    pub username: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    /// Profile image URL (defaults to the configured placeholder)
    #[arg(long)]
    pub image_url: Option<String>,
    /// Password (or set HEALTHLOG_PASSWORD; prompted if neither)
    #[arg(long)]
    pub password: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::new().with_prompt(prompt).interact_text()?),
    }
}

pub fn run(args: SignupArgs) -> Result<()> {
    let ctx = get_context()?;

    let request = SignupRequest {
        username: prompt_if_missing(args.username, "Username")?,
        email: prompt_if_missing(args.email, "Email")?,
        first_name: prompt_if_missing(args.first_name, "First name")?,
        last_name: prompt_if_missing(args.last_name, "Last name")?,
        image_url: args.image_url,
        password: get_new_password(args.password, "Password")?,
    };

    let mut session = ctx.session();
    ctx.users.signup(&mut session, request)?;

    let persisted = match session.commit() {
        Ok(persisted) => persisted,
        Err(e) => {
            log_event(
                LogEvent::new("signup_failed")
                    .with_entity("user")
                    .with_command("signup")
                    .with_error(e.kind()),
            );
            return Err(commit_error(e));
        }
    };
    log_event(LogEvent::new("user_created").with_entity("user").with_command("signup"));

    let user = persisted
        .first()
        .and_then(|p| p.as_user())
        .ok_or_else(|| anyhow::anyhow!("Signup did not return a user"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(user)?);
    } else {
        println!("{} Created {}", "✓".green(), user);
    }

    Ok(())
}
