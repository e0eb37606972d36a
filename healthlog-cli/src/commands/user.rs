//! User command - list, show, update and delete accounts

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use healthlog_core::domain::ProfileUpdate;
use healthlog_core::LogEvent;

use super::{
    commit_error, get_context, get_new_password, get_password, log_event, resolve_user,
};
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// List all users
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one user
    Show {
        /// User id or username
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update profile fields
    Update {
        /// User id or username
        user: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Change password
    Passwd {
        /// User id or username
        user: String,
        /// Current password
        #[arg(long)]
        current: Option<String>,
        /// New password
        #[arg(long)]
        new: Option<String>,
    },
    /// Delete a user and their BMI history
    Delete {
        /// User id or username
        user: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: UserCommands) -> Result<()> {
    match command {
        UserCommands::List { json } => run_list(json),
        UserCommands::Show { user, json } => run_show(&user, json),
        UserCommands::Update { user, first_name, last_name, image_url } => {
            run_update(&user, ProfileUpdate { first_name, last_name, image_url })
        }
        UserCommands::Passwd { user, current, new } => run_passwd(&user, current, new),
        UserCommands::Delete { user, force, json } => run_delete(&user, force, json),
    }
}

fn run_list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let users = ctx.users.list(&ctx.session())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users yet. Create one with 'hl signup'.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Username", "Name", "Email"]);
    for user in &users {
        table.add_row(vec![
            user.id.map(|id| id.to_string()).unwrap_or_default(),
            user.username.clone(),
            user.full_name(),
            user.email.clone(),
        ]);
    }
    println!("{}", table);

    Ok(())
}

fn run_show(key: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.session();
    let user = resolve_user(&ctx, &session, key)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }

    let user_id = user.id.unwrap_or_default();
    let latest = ctx.bmi.latest(&session, user_id)?;
    let posts = ctx.posts.by_author(&session, user_id)?;

    println!("{}", user.username.bold());
    println!("  Name:   {}", user.full_name());
    println!("  Email:  {}", user.email);
    println!("  Image:  {}", user.image_url.as_deref().unwrap_or("-"));
    match latest {
        Some(result) => println!(
            "  BMI:    {:.1} ({}) on {}",
            result.bmi,
            result.health_condition,
            output::format_datetime(result.result_date)
        ),
        None => println!("  BMI:    -"),
    }
    println!("  Posts:  {}", posts.len());

    Ok(())
}

fn run_update(key: &str, update: ProfileUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update: pass --first-name, --last-name or --image-url");
    }

    let ctx = get_context()?;
    let mut session = ctx.session();
    let user = resolve_user(&ctx, &session, key)?;
    let user_id = user.id.unwrap_or_default();

    ctx.users.update_profile(&mut session, user_id, update)?;
    session.commit().map_err(commit_error)?;
    log_event(LogEvent::new("profile_updated").with_entity("user").with_command("user update"));

    output::success(&format!("Updated {}", user.username));
    Ok(())
}

fn run_passwd(key: &str, current: Option<String>, new: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let mut session = ctx.session();
    let user = resolve_user(&ctx, &session, key)?;
    let user_id = user.id.unwrap_or_default();

    let current = get_password(current, "Current password")?;
    let new = get_new_password(new, "New password")?;

    let outcome = ctx.users.change_password(&mut session, user_id, &current, &new)?;
    if !outcome.is_authenticated() {
        log_event(LogEvent::new("password_change_failed").with_entity("user").with_command("user passwd"));
        bail!("Current password is incorrect");
    }
    session.commit().map_err(commit_error)?;
    log_event(LogEvent::new("password_changed").with_entity("user").with_command("user passwd"));

    output::success("Password changed");
    Ok(())
}

fn run_delete(key: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.session();
    let user = resolve_user(&ctx, &session, key)?;
    let user_id = user.id.unwrap_or_default();

    if !force && !json {
        println!(
            "\n{}",
            format!("This will delete {} and all of their BMI results.", user.username).yellow()
        );
        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    let deletion = ctx.users.delete(&session, user_id)?;
    log_event(LogEvent::new("user_deleted").with_entity("user").with_command("user delete"));

    if json {
        println!("{}", serde_json::to_string_pretty(&deletion)?);
        return Ok(());
    }

    output::success(&format!("Deleted {}", user.username));
    println!("  BMI results removed: {}", deletion.bmi_results_deleted);
    if deletion.posts_deleted > 0 {
        println!("  Posts removed: {}", deletion.posts_deleted);
    }
    if deletion.posts_orphaned > 0 {
        output::warning(&format!("  {} post(s) kept without an author", deletion.posts_orphaned));
    }
    Ok(())
}
