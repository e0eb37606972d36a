//! Password hashing parameters

use serde::{Deserialize, Serialize};

/// Default Argon2id parameters (OWASP minimum for Argon2id)
pub const DEFAULT_TIME_COST: u32 = 2;
pub const DEFAULT_MEMORY_COST: u32 = 19456; // 19 MiB
pub const DEFAULT_PARALLELISM: u32 = 1;

/// Salt length in bytes, fresh for every digest
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters used when producing new digests
///
/// Verification always uses the parameters embedded in the stored digest,
/// so changing these only affects passwords hashed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Argon2Params {
    pub time_cost: u32,
    pub memory_cost: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            time_cost: DEFAULT_TIME_COST,
            memory_cost: DEFAULT_MEMORY_COST,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}
