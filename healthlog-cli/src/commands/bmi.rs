//! BMI command - record measurements and show history

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use comfy_table::{Cell, Color};
use healthlog_core::services::BmiService;
use healthlog_core::{HealthCondition, LogEvent, UnitSystem};

use super::{commit_error, get_context, log_event, resolve_user};
use crate::output;

#[derive(Subcommand)]
pub enum BmiCommands {
    /// Record a new measurement
    Record {
        /// User id or username
        user: String,
        #[arg(long)]
        age: i32,
        /// Weight in lb (imperial) or kg (metric)
        #[arg(long)]
        weight: i32,
        /// Height in inches (imperial) or cm (metric)
        #[arg(long)]
        height: f64,
        /// Override the configured unit system (metric, imperial)
        #[arg(long)]
        units: Option<UnitSystem>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a user's results, newest first
    History {
        /// User id or username
        user: String,
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: BmiCommands) -> Result<()> {
    match command {
        BmiCommands::Record { user, age, weight, height, units, json } => {
            run_record(&user, age, weight, height, units, json)
        }
        BmiCommands::History { user, limit, json } => run_history(&user, limit, json),
    }
}

fn condition_color(condition: &str) -> Color {
    match condition {
        c if c == HealthCondition::Normal.as_str() => Color::Green,
        c if c == HealthCondition::Obese.as_str() => Color::Red,
        _ => Color::Yellow,
    }
}

fn run_record(
    key: &str,
    age: i32,
    weight: i32,
    height: f64,
    units: Option<UnitSystem>,
    json: bool,
) -> Result<()> {
    let ctx = get_context()?;
    let mut session = ctx.session();
    let user = resolve_user(&ctx, &session, key)?;
    let user_id = user.id.unwrap_or_default();

    let service = units.map(BmiService::new);
    let service = service.as_ref().unwrap_or(&ctx.bmi);

    service.record_measurement(&mut session, user_id, age, weight, height)?;
    let persisted = session.commit().map_err(commit_error)?;
    log_event(LogEvent::new("bmi_recorded").with_entity("bmi_result").with_command("bmi record"));

    let result = persisted
        .first()
        .and_then(|p| p.as_bmi_result())
        .ok_or_else(|| anyhow::anyhow!("Recording did not return a result"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!(
            "{} BMI {} for {}: {}",
            "✓".green(),
            format!("{:.1}", result.bmi).bold(),
            user.username,
            result.health_condition
        );
    }
    Ok(())
}

fn run_history(key: &str, limit: usize, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let session = ctx.session();
    let user = resolve_user(&ctx, &session, key)?;

    let mut history = ctx.bmi.history(&session, user.id.unwrap_or_default())?;
    history.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    if history.is_empty() {
        println!("No BMI results for {}.", user.username);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Age", "Weight", "Height", "BMI", "Condition"]);
    for result in &history {
        table.add_row(vec![
            Cell::new(output::format_datetime(result.result_date)),
            Cell::new(result.age),
            Cell::new(result.weight),
            Cell::new(result.height),
            Cell::new(format!("{:.1}", result.bmi)),
            Cell::new(&result.health_condition).fg(condition_color(&result.health_condition)),
        ]);
    }
    println!("{}", table);
    Ok(())
}
