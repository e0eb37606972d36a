//! Status command - show database summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{Table, ContentArrangement};

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Healthlog Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Users", &status.total_users.to_string()]);
    table.add_row(vec!["BMI Results", &status.total_bmi_results.to_string()]);
    table.add_row(vec!["Posts", &status.total_posts.to_string()]);
    table.add_row(vec!["Posts without author", &status.orphaned_posts.to_string()]);

    println!("{}", table);
    println!();

    if let Some(latest) = &status.latest_post {
        println!("Latest post: {}", latest);
    }
    if let Some(path) = &status.database_path {
        let size = status.database_size.map(output::format_size).unwrap_or_default();
        println!("Database: {} ({})", path, size);
    }
    println!(
        "Units: {:?}, post retention: {:?}",
        ctx.config.units, ctx.config.post_retention
    );

    Ok(())
}
