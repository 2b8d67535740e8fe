//! Password hashing and verification.
use crate::error::PasswordError;

/// bcrypt only reads this many bytes of input; anything longer would be
/// silently truncated, so longer passwords are refused outright.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// One-way password hashing. The salt is embedded in the returned hash.
#[cfg_attr(test, mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// `Err(PasswordError::Mismatch)` when `plaintext` does not produce `hash`.
    fn verify(&self, hash: &str, plaintext: &str) -> Result<(), PasswordError>;
}

/// bcrypt with a configurable cost factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong(MAX_PASSWORD_BYTES));
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    fn verify(&self, hash: &str, plaintext: &str) -> Result<(), PasswordError> {
        // No stored hash was ever made from an over-long password
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::Mismatch);
        }
        if bcrypt::verify(plaintext, hash)? {
            Ok(())
        } else {
            Err(PasswordError::Mismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Lowest cost bcrypt accepts, keeps the tests fast
    fn hasher() -> BcryptHasher {
        BcryptHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        for password in ["secret123", "", "pässwörd with spaces"] {
            let hash = hasher.hash(password).unwrap();
            assert_ne!(hash, password);
            assert!(hasher.verify(&hash, password).is_ok());
        }
    }

    #[test]
    fn test_wrong_password_is_mismatch() {
        let hasher = hasher();
        let hash = hasher.hash("secret123").unwrap();
        assert_eq!(hasher.verify(&hash, "secret124"), Err(PasswordError::Mismatch));
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("secret123").unwrap();
        let second = hasher.hash("secret123").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_passwords_past_the_limit_are_refused() {
        let hasher = hasher();
        let prefix = "a".repeat(MAX_PASSWORD_BYTES);

        let at_limit = hasher.hash(&prefix).unwrap();
        assert!(hasher.verify(&at_limit, &prefix).is_ok());

        // Sharing the first 72 bytes must not make two passwords equivalent
        let long = format!("{}one", prefix);
        assert_eq!(hasher.hash(&long), Err(PasswordError::TooLong(MAX_PASSWORD_BYTES)));
        assert_eq!(hasher.verify(&at_limit, &long), Err(PasswordError::Mismatch));
        assert_eq!(
            hasher.verify(&at_limit, &format!("{}two", prefix)),
            Err(PasswordError::Mismatch)
        );
    }

    #[test]
    fn test_invalid_cost_is_hashing_error() {
        let hasher = BcryptHasher::new(99);
        assert!(matches!(hasher.hash("secret123"), Err(PasswordError::Hashing(_))));
    }

    #[test]
    fn test_garbage_hash_is_hashing_error() {
        let result = hasher().verify("not-a-bcrypt-hash", "secret123");
        assert!(matches!(result, Err(PasswordError::Hashing(_))));
    }
}
