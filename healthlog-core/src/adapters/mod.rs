//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - Argon2id for the CredentialHasher port

pub mod argon2_hasher;
pub mod duckdb;
