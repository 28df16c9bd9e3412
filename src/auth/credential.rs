use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Failures in the credential store. `Hash` means the hashing primitive
/// itself failed and the operation cannot be completed with the requested
/// strength; callers must propagate it, never fall back to a weaker scheme.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Output of a password hash: everything an account row needs to verify the
/// password later and to migrate the work factor forward over time.
#[derive(Debug, Clone)]
pub struct PasswordRecord {
    /// Argon2id hash in PHC string format (parameters and salt included).
    pub hash: String,
    /// The salt that was applied, kept alongside for reference.
    pub salt: String,
    /// Time cost (iterations) applied when the hash was computed.
    pub cost: u32,
}

/// Hash a password with Argon2id and a fresh random salt.
///
/// Two calls with the same password never produce the same hash: the salt is
/// drawn from the OS CSPRNG on every call. CPU-heavy; callers on the async
/// runtime should wrap this in `spawn_blocking`.
pub fn hash_password(
    password: &str,
    security: &SecurityConfig,
) -> Result<PasswordRecord, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        security.argon2_memory_cost_kib,
        security.argon2_time_cost,
        security.argon2_parallelism,
        None,
    )
    .map_err(|e| CredentialError::Hash(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError::Hash(e.to_string()))?;

    Ok(PasswordRecord {
        hash: hash.to_string(),
        salt: salt.as_str().to_string(),
        cost: security.argon2_time_cost,
    })
}

/// Verify a password against a stored PHC hash string.
///
/// The cost parameters and salt travel inside the stored hash, so rows
/// written under an older work factor keep verifying after the default
/// changes. Comparison is constant-time (argon2's verifier). A mismatch is
/// `Ok(false)`; only an undecodable stored hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, CredentialError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| CredentialError::MalformedHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError::MalformedHash(e.to_string())),
    }
}
