//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services
//! depend only on these traits, not on concrete implementations.

mod hasher;
mod repository;

pub use hasher::CredentialHasher;
pub use repository::{
    BmiFilter, Persisted, PostFilter, Repository, StagedWrite, TableCounts, UserDeletion,
    UserFilter,
};
