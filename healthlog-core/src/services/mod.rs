//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area. Services that read or
//! write entities take an explicit `Session`.

mod bmi;
mod doctor;
pub mod logging;
pub mod migration;
mod posts;
mod session;
mod status;
mod users;

pub use bmi::BmiService;
pub use doctor::{CheckResult, DoctorResult, DoctorService, DoctorSummary};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use posts::PostService;
pub use session::Session;
pub use status::{StatusService, StatusSummary};
pub use users::UserService;
