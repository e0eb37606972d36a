//! Healthlog CLI - accounts, BMI history and posts in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{bmi, doctor, login, logs, post, signup, status, user};

/// Healthlog - track BMI and share posts from your terminal
#[derive(Parser)]
#[command(name = "hl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new account
    Signup(signup::SignupArgs),

    /// Check a username and password
    Login {
        username: String,
        /// Password (or set HEALTHLOG_PASSWORD; prompted if neither)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },

    /// Record and view BMI results
    Bmi {
        #[command(subcommand)]
        command: bmi::BmiCommands,
    },

    /// Write and read posts
    Post {
        #[command(subcommand)]
        command: post::PostCommands,
    },

    /// Show database summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run database health checks
    Doctor {
        /// Show verbose output
        #[arg(long, short)]
        verbose: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Command name for the event log
    fn name(&self) -> &'static str {
        match self {
            Commands::Signup(_) => "signup",
            Commands::Login { .. } => "login",
            Commands::User { .. } => "user",
            Commands::Bmi { .. } => "bmi",
            Commands::Post { .. } => "post",
            Commands::Status { .. } => "status",
            Commands::Doctor { .. } => "doctor",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let name = cli.command.name();

    let logger = commands::get_logger();
    if let Some(l) = logger {
        let _ = l.log_command(name);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(l) = logger {
                let kind = e
                    .downcast_ref::<healthlog_core::Error>()
                    .map(|err| err.kind())
                    .unwrap_or("error");
                let _ = l.log_error("command_failed", kind, Some(name));
            }
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Signup(args) => signup::run(args),
        Commands::Login { username, password, json } => login::run(&username, password, json),
        Commands::User { command } => user::run(command),
        Commands::Bmi { command } => bmi::run(command),
        Commands::Post { command } => post::run(command),
        Commands::Status { json } => status::run(json),
        Commands::Doctor { verbose, json } => doctor::run(verbose, json),
        Commands::Logs { command } => logs::run(command),
    }
}
