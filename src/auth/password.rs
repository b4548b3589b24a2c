use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use tracing::error;

lazy_static! {
    /// Throwaway hash with the same parameters as real ones.
    static ref DUMMY_HASH: Option<String> = hash_password("blogql-dummy-credential").ok();
}

fn argon_err(op: &'static str) -> impl FnOnce(password_hash::Error) -> anyhow::Error {
    move |e| {
        error!(error = %e, op, "argon2 failure");
        anyhow::anyhow!("{op}: {e}")
    }
}

/// Salted Argon2id PHC string for `plain`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(argon_err("hash password"))?;
    Ok(hash.to_string())
}

/// Checks `candidate` against a stored PHC string. A malformed hash is an error, not a mismatch.
pub fn verify_password(stored_hash: &str, candidate: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(argon_err("parse stored hash"))?;
    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(argon_err("verify password")(e)),
    }
}

/// Spends one full verification against [`DUMMY_HASH`] so a login for a missing account costs
/// as much as a wrong password. Returns whether the verifier actually ran.
pub fn verify_dummy(candidate: &str) -> bool {
    match DUMMY_HASH.as_deref() {
        Some(hash) => verify_password(hash, candidate).is_ok(),
        None => false,
    }
}
