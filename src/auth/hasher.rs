//! Password hashing.
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`)
//! stored as raw bytes. Every call to `hash` draws a fresh salt from the OS.

use super::error::HashError;
use argon2::{
    password_hash::{self, SaltString},
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
};
use rand::rngs::OsRng;

pub trait CredentialHasher: Send + Sync {
    /// # Errors
    /// Returns an error if the password cannot be hashed.
    fn hash(&self, password: &str) -> Result<Vec<u8>, HashError>;

    /// Check `password` against a stored hash. A mismatch is `Ok(false)`.
    ///
    /// # Errors
    /// Returns an error if the stored hash is malformed.
    fn verify(&self, pass_hash: &[u8], password: &str) -> Result<bool, HashError>;
}

#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// Build a hasher with explicit cost parameters.
    ///
    /// # Errors
    /// Returns [`HashError::Params`] if Argon2 rejects the combination.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashError::Params(e.to_string()))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<Vec<u8>, HashError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashError::Hash(e.to_string()))?;

        Ok(hash.to_string().into_bytes())
    }

    fn verify(&self, pass_hash: &[u8], password: &str) -> Result<bool, HashError> {
        let encoded = std::str::from_utf8(pass_hash).map_err(|_| HashError::MalformedHash)?;
        let parsed = PasswordHash::new(encoded).map_err(|_| HashError::MalformedHash)?;

        // verify_password reads the cost parameters from the PHC string and
        // compares in constant time
        match self.argon2().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(HashError::Hash(e.to_string())),
        }
    }
}
