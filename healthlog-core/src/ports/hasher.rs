//! Credential hasher port

use crate::domain::result::Result;

/// Salted one-way password hashing
///
/// `hash` must use a fresh random salt on every call, so two digests of the
/// same plaintext differ while both verify.
pub trait CredentialHasher: Send + Sync {
    /// Produce a self-describing digest (salt and parameters embedded)
    fn hash(&self, plaintext: &str) -> Result<String>;

    /// True iff `plaintext` matches `digest`; malformed digests never match
    fn verify(&self, digest: &str, plaintext: &str) -> bool;
}
