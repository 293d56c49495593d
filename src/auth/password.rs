//! Password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::Error;
use crate::types::PasswordHash;

/// Argon2 hashing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Argon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Argon2Params {
    /// Create Argon2 instance with these parameters.
    fn to_argon2(self) -> Result<Argon2<'static>, Error> {
        let params = Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| Error::Internal {
            operation: format!("create argon2 params: {e}"),
        })?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl Default for Argon2Params {
    /// Secure defaults for production (Argon2id RFC recommendations)
    fn default() -> Self {
        Self {
            memory_kib: 19456, // 19 MB
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Hash a plaintext password using Argon2.
///
/// Uses the provided parameters or secure defaults if None. This is the
/// only place plaintext crosses into hash form; the resulting
/// [`PasswordHash`] is what gets stored.
pub fn hash_password_with_params(input: &str, params: Option<Argon2Params>) -> Result<PasswordHash, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = if let Some(p) = params {
        p.to_argon2()?
    } else {
        Argon2Params::default().to_argon2()?
    };

    let hash = argon2.hash_password(input.as_bytes(), &salt).map_err(|e| Error::Internal {
        operation: format!("hash password: {e}"),
    })?;

    PasswordHash::from_hash(hash.to_string()).map_err(|e| Error::Internal {
        operation: format!("wrap password hash: {e}"),
    })
}

/// Hash a plaintext password using Argon2 with default secure parameters.
pub fn hash_password(input: &str) -> Result<PasswordHash, Error> {
    hash_password_with_params(input, None)
}

/// Verify a plaintext password against a stored hash.
///
/// Note: Verification uses the parameters embedded in the hash itself, and
/// argon2's comparison is constant-time.
pub fn verify_password(input: &str, hash: &PasswordHash) -> Result<bool, Error> {
    let parsed_hash = argon2::password_hash::PasswordHash::new(hash.as_str()).map_err(|e| Error::Internal {
        operation: format!("parse hash: {e}"),
    })?;

    // Verification always uses params from the hash
    let argon2 = Argon2::default();
    Ok(argon2.verify_password(input.as_bytes(), &parsed_hash).is_ok())
}
