use bcrypt::{hash, verify};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(bcrypt::BcryptError),
    #[error("Password verification failed: {0}")]
    VerificationFailed(bcrypt::BcryptError),
}

/// bcrypt avec un coût configurable (`BCRYPT_COST`). `verify` compare en temps constant.
#[derive(Debug, Clone, Copy)]
pub struct PasswordManager {
    cost: u32,
}

impl PasswordManager {
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(4, 31),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        hash(password, self.cost).map_err(PasswordError::HashingFailed)
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        verify(password, hash).map_err(PasswordError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PasswordManager {
        PasswordManager::new(4)
    }

    #[test]
    fn verify_returns_true_when_password_matches() {
        let password = "secure_password_@123P";
        let hashed = manager().hash(password).expect("Hashing failed");

        assert!(manager().verify(password, &hashed).expect("Verification failed"));
    }

    #[test]
    fn verify_returns_false_when_password_does_not_match() {
        let hashed = manager().hash("secure_password_@123P").expect("Hashing failed");

        assert!(!manager().verify("wrong_password_@123", &hashed).expect("Verification failed"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let hash1 = manager().hash("same_password").unwrap();
        let hash2 = manager().hash("same_password").unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn verify_fails_when_case_differs() {
        let hash = manager().hash("MyPassword").unwrap();

        let result = manager().verify("mypassword", &hash);
        assert!(!result.unwrap()); // false, not an error
    }

    #[test]
    fn hash_carries_configured_cost() {
        let hash = manager().hash("pw").unwrap();
        assert!(hash.starts_with("$2b$04$"));
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(matches!(
            manager().verify("pw", "not-a-bcrypt-hash"),
            Err(PasswordError::VerificationFailed(_))
        ));
    }
}
