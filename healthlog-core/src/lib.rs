//! Healthlog Core - data layer for a small health-tracking app
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (User, BmiResult, Post) and value types
//! - **ports**: Trait definitions for external dependencies (Repository, CredentialHasher)
//! - **services**: Business logic over an explicit `Session`
//! - **adapters**: Concrete implementations (DuckDB, Argon2id)

pub mod domain;
pub mod ports;
pub mod services;
pub mod adapters;
pub mod config;
pub mod migrations;
pub mod log_migrations;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::argon2_hasher::Argon2Hasher;
use adapters::duckdb::DuckDbRepository;
use config::Config;
use ports::Repository;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    AuthOutcome, BmiResult, HealthCondition, Post, PostRetention, SignupRequest, UnitSystem, User,
};
pub use domain::result::Error;
pub use services::{EntryPoint, LogEvent, LoggingService, Session};

/// Name of the main database file inside the data directory
pub const DB_FILENAME: &str = "healthlog.duckdb";

/// Main context for Healthlog operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services. Entity
/// operations go through a `Session` obtained from `session()`.
pub struct HealthlogContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub users: UserService,
    pub bmi: BmiService,
    pub posts: PostService,
    pub status_service: StatusService,
    pub doctor_service: DoctorService,
}

impl HealthlogContext {
    /// Open (or create) the database in `data_dir` and ensure its schema
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(DB_FILENAME);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );

        Self::build(config, repository)
    }

    /// A context backed by an in-memory database
    pub fn in_memory(config: Config) -> Result<Self> {
        let repository = Arc::new(DuckDbRepository::open_in_memory()?);
        Self::build(config, repository)
    }

    fn build(config: Config, repository: Arc<DuckDbRepository>) -> Result<Self> {
        // Initialize schema
        repository
            .ensure_schema()
            .context("Failed to initialize database schema")?;

        let hasher = Arc::new(Argon2Hasher::new(config.password_hashing));

        let users = UserService::new(hasher, config.default_image_url.clone(), config.post_retention);
        let bmi = BmiService::new(config.units);
        let posts = PostService::new();
        let status_service = StatusService::new(Arc::clone(&repository));
        let doctor_service = DoctorService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            repository,
            users,
            bmi,
            posts,
            status_service,
            doctor_service,
        })
    }

    /// Start a new unit of work
    pub fn session(&self) -> Session {
        Session::new(self.repository.clone())
    }
}
