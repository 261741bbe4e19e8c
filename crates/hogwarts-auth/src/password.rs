// Hogwarts Auth - Password hashing

use crate::error::AuthError;

/// bcrypt work factor used for stored passwords.
pub const DEFAULT_COST: u32 = 12;

/// One-way password hashing with bcrypt.
///
/// Hashes embed their salt and cost, so verification works for hashes created
/// with any cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// Hasher with a non-default cost. Only tests should need this.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    /// Returns `Ok(false)` on mismatch; `Err` only when `hash` is not a
    /// valid bcrypt hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(bcrypt::verify(password, hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hasher = PasswordHasher::with_cost(4);
        let hash = hasher.hash("123456").expect("hash");

        assert_ne!(hash, "123456");
        assert!(hasher.verify("123456", &hash).expect("verify"));
        assert!(!hasher.verify("654321", &hash).expect("verify"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let hasher = PasswordHasher::with_cost(4);
        let first = hasher.hash("secret").expect("hash");
        let second = hasher.hash("secret").expect("hash");
        assert_ne!(first, second, "salts should differ");
    }

    #[test]
    fn test_default_cost_is_embedded_in_hash() {
        let hash = PasswordHasher::default().hash("pw").expect("hash");
        assert!(hash.starts_with("$2b$12$"), "unexpected hash prefix: {}", hash);
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        let hasher = PasswordHasher::default();
        assert!(hasher.verify("pw", "not-a-bcrypt-hash").is_err());
    }
}
