//! Password digests and random keys for API tokens and browser sessions.

use crate::error::AppError;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;

/// Token and session keys are 20 random bytes, 40 hex characters.
const KEY_BYTES: usize = 20;

pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Argon2id digest in PHC string form (`$argon2id$v=19$...`).
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// False for a wrong password and for anything that is not a PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!("stored password digest is not a PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash_password("apipass123").unwrap();
        assert!(stored.starts_with("$argon2id$"));
        assert!(verify_password("apipass123", &stored));
        assert!(!verify_password("apipass124", &stored));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(hash_password("secret").unwrap(), hash_password("secret").unwrap());
    }

    #[rstest]
    #[case("")]
    #[case("plain")]
    #[case("sha256$30000$aa$bb")]
    #[case("$argon2id$v=19$m=19456,t=2,p=1$c2FsdA")]
    fn malformed_digests_never_verify(#[case] stored: &str) {
        assert!(!verify_password("plain", stored));
    }

    #[test]
    fn keys_are_forty_hex_chars() {
        let key = generate_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_key());
    }
}
