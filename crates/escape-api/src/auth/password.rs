/// Password hashing and verification using Argon2id
///
/// Stored hashes are PHC strings, so the salt and cost parameters travel
/// with the hash and verification needs no configuration.
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Argon2id cost parameters used when creating new hashes
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_cost: u32,
    /// Iterations (default: 3)
    pub time_cost: u32,
    /// Lanes (default: 4)
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl PasswordConfig {
    /// Cheapest parameters Argon2 accepts; for tests and fixtures only
    pub fn minimal() -> Self {
        Self {
            memory_cost: Params::MIN_M_COST.max(8),
            time_cost: 1,
            parallelism: 1,
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(self.memory_cost, self.time_cost, self.parallelism, Some(32))
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            params,
        ))
    }

    /// Hash `password` with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(hash.to_string())
    }
}

/// Check `password` against a stored PHC hash
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(_)` - The stored hash is unusable
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = PasswordConfig::minimal().hash("luxury-Travel-2024").unwrap();

        assert!(verify_password("luxury-Travel-2024", &hash).unwrap());
        assert!(!verify_password("luxury-travel-2024", &hash).unwrap());
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let config = PasswordConfig::minimal();
        let hash1 = config.hash("SamePassword123!").unwrap();
        let hash2 = config.hash("SamePassword123!").unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password("SamePassword123!", &hash1).unwrap());
        assert!(verify_password("SamePassword123!", &hash2).unwrap());
    }

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = PasswordConfig::minimal().hash("pw").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("t=1"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = PasswordConfig {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 0,
        };
        assert!(matches!(
            config.hash("pw"),
            Err(PasswordError::HashingFailed(_))
        ));
    }
}
