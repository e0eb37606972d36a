//! Core domain entities
//!
//! Plain data structures with validation logic only. Lookups, hashing and
//! writes live in the services and the repository port.

mod bmi;
mod credentials;
mod post;
pub mod result;
mod user;

pub use bmi::{BmiResult, HealthCondition, Measurement, UnitSystem};
pub use credentials::{Argon2Params, SALT_LEN};
pub use post::{Post, PostRetention, PostUpdate};
pub use user::{AuthOutcome, ProfileUpdate, SignupRequest, User, DEFAULT_IMAGE_URL};
