//! Salted password hashing.
//!
//! Each actor row stores a random hex salt next to an Argon2id PHC string.
//! The salt is prepended to the plaintext before hashing, so the stored hash
//! is useless without the matching salt column.

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, Version};

use crate::{config::Config, error::AppError};

/// Derives and verifies salted password hashes with fixed Argon2 cost parameters.
pub struct PasswordVerifier {
    argon2: Argon2<'static>,

    /// Hash of a random password under the same parameters, verified
    /// against when a login names no usable account
    dummy_hash: String,
}

impl PasswordVerifier {
    /// Build a verifier with explicit Argon2id cost parameters.
    ///
    /// # Errors
    ///
    /// `Internal` if the parameters are outside Argon2's accepted ranges.
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AppError::Internal(format!("invalid password hashing parameters: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = argon2
            .hash_password(generate_salt().as_bytes(), &SaltString::generate(&mut OsRng))
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(
            config.password_memory_kib,
            config.password_iterations,
            config.password_parallelism,
        )
    }

    /// Generate a fresh salt and hash `salt + password`.
    ///
    /// Returns `(salt, hash)`.
    pub fn derive(&self, password: &str) -> Result<(String, String), AppError> {
        let salt = generate_salt();
        let phc_salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(salted(&salt, password).as_bytes(), &phc_salt)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
            .to_string();

        Ok((salt, hash))
    }

    /// Check `password` against a stored `(salt, hash)` pair.
    ///
    /// A wrong password and a malformed stored hash both yield `false`.
    pub fn verify(&self, salt: &str, password: &str, hash: &str) -> bool {
        use argon2::PasswordVerifier as _;

        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };

        self.argon2
            .verify_password(salted(salt, password).as_bytes(), &parsed)
            .is_ok()
    }

    /// Run one full verification of `password` against a throwaway hash.
    ///
    /// Called when the account is unknown or inactive.
    pub fn reject(&self, password: &str) {
        let _ = self.verify("", password, &self.dummy_hash);
    }
}

fn salted(salt: &str, password: &str) -> String {
    format!("{salt}{password}")
}

/// 32 hex characters (16 random bytes).
fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
pub(crate) fn test_verifier() -> PasswordVerifier {
    // Minimum Argon2 cost keeps the test suite fast
    PasswordVerifier::new(8, 1, 1).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_then_verify() {
        let verifier = test_verifier();
        let (salt, hash) = verifier.derive("correct horse").unwrap();

        assert_eq!(salt.len(), 32);
        assert!(verifier.verify(&salt, "correct horse", &hash));
        assert!(!verifier.verify(&salt, "battery staple", &hash));
    }

    #[test]
    fn salt_is_part_of_the_hashed_input() {
        let verifier = test_verifier();
        let (salt, hash) = verifier.derive("secret1").unwrap();
        let (other_salt, _) = verifier.derive("secret1").unwrap();

        assert_ne!(salt, other_salt);
        assert!(!verifier.verify(&other_salt, "secret1", &hash));
    }

    #[test]
    fn malformed_hash_is_rejected_without_error() {
        let verifier = test_verifier();
        assert!(!verifier.verify("abc", "secret1", "not-a-phc-string"));
    }

    #[test]
    fn reject_checks_a_real_hash() {
        let verifier = test_verifier();

        assert!(PasswordHash::new(&verifier.dummy_hash).is_ok());
        assert!(!verifier.verify("", "secret1", &verifier.dummy_hash));
        assert_ne!(verifier.dummy_hash, test_verifier().dummy_hash);
        verifier.reject("secret1");
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(PasswordVerifier::new(0, 0, 0).is_err());
    }
}
