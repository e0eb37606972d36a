//! Post command - write, list, edit and delete posts

use anyhow::{bail, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};
use healthlog_core::domain::PostUpdate;
use healthlog_core::{LogEvent, Post};

use super::{commit_error, get_context, log_event, resolve_user};
use crate::output;

#[derive(Subcommand)]
pub enum PostCommands {
    /// Write a new post
    New {
        /// Author id or username; omit for an anonymous post
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List posts, newest first
    List {
        /// Only posts by this author
        #[arg(long)]
        author: Option<String>,
        /// Only posts without an author
        #[arg(long, conflicts_with = "author")]
        orphaned: bool,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one post
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a post
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Delete a post
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: PostCommands) -> Result<()> {
    match command {
        PostCommands::New { author, title, content, image_url, json } => {
            run_new(author, title, content, image_url, json)
        }
        PostCommands::List { author, orphaned, limit, json } => run_list(author, orphaned, limit, json),
        PostCommands::Show { id, json } => run_show(id, json),
        PostCommands::Edit { id, title, content, image_url } => {
            run_edit(id, PostUpdate { title, content, image_url })
        }
        PostCommands::Delete { id, force } => run_delete(id, force),
    }
}

fn run_new(
    author: Option<String>,
    title: Option<String>,
    content: Option<String>,
    image_url: Option<String>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let mut session = ctx.session();

    let author_id = match author {
        Some(key) => resolve_user(&ctx, &session, &key)?.id,
        None => None,
    };

    let title = match title {
        Some(t) => t,
        None => Input::new().with_prompt("Title").interact_text()?,
    };
    let content = match content {
        Some(c) => c,
        None => Input::new().with_prompt("Content").interact_text()?,
    };

    let mut post = Post::new(title, content);
    if let Some(user_id) = author_id {
        post = post.by(user_id);
    }
    if let Some(url) = image_url {
        post = post.with_image_url(url);
    }

    ctx.posts.create(&mut session, post);
    let persisted = session.commit().map_err(commit_error)?;
    log_event(LogEvent::new("post_created").with_entity("post").with_command("post new"));

    let post = persisted
        .first()
        .and_then(|p| p.as_post())
        .ok_or_else(|| anyhow::anyhow!("Posting did not return a post"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(post)?);
    } else {
        println!("{} Posted #{}", "✓".green(), post.id.unwrap_or_default());
    }
    Ok(())
}

fn run_list(author: Option<String>, orphaned: bool, limit: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.session();

    let mut posts = match (author, orphaned) {
        (Some(key), _) => {
            let user = resolve_user(&ctx, &session, &key)?;
            ctx.posts.by_author(&session, user.id.unwrap_or_default())?
        }
        (None, true) => ctx.posts.orphaned(&session)?,
        (None, false) => ctx.posts.recent(&session, limit)?,
    };
    posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
    posts.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&posts)?);
        return Ok(());
    }

    if posts.is_empty() {
        println!("No posts found.");
        return Ok(());
    }

    let users = ctx.users.list(&session)?;
    let author_name = |user_id: Option<i64>| -> String {
        user_id
            .and_then(|id| users.iter().find(|u| u.id == Some(id)))
            .map(|u| u.username.clone())
            .unwrap_or_else(|| "(no author)".to_string())
    };

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Posted", "Author", "Title", "Content"]);
    for post in &posts {
        table.add_row(vec![
            post.id.map(|id| id.to_string()).unwrap_or_default(),
            output::format_datetime(post.timestamp),
            author_name(post.user_id),
            post.title.clone(),
            output::truncate(&post.content, 40),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn run_show(id: i64, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.session();
    let post = ctx.posts.get(&session, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&post)?);
        return Ok(());
    }

    let author = match post.user_id {
        Some(user_id) => ctx.users.get(&session, user_id)?.username,
        None => "(no author)".dimmed().to_string(),
    };

    println!("{}", post.title.bold());
    println!("{} by {}", output::format_datetime(post.timestamp), author);
    if let Some(url) = &post.image_url {
        println!("Image: {}", url);
    }
    println!();
    println!("{}", post.content);
    Ok(())
}

fn run_edit(id: i64, update: PostUpdate) -> Result<()> {
    if update.is_empty() {
        bail!("Nothing to update: pass --title, --content or --image-url");
    }

    let ctx = get_context()?;
    let mut session = ctx.session();
    ctx.posts.update(&mut session, id, update)?;
    session.commit().map_err(commit_error)?;
    log_event(LogEvent::new("post_updated").with_entity("post").with_command("post edit"));

    output::success(&format!("Updated post #{}", id));
    Ok(())
}

fn run_delete(id: i64, force: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.session();
    let post = ctx.posts.get(&session, id)?;

    if !force
        && !Confirm::new()
            .with_prompt(format!("Delete post '{}'?", post.title))
            .default(false)
            .interact()?
    {
        println!("{}", "Cancelled".dimmed());
        return Ok(());
    }

    ctx.posts.delete(&session, id)?;
    log_event(LogEvent::new("post_deleted").with_entity("post").with_command("post delete"));
    output::success(&format!("Deleted post #{}", id));
    Ok(())
}
