//! Argon2id password hashes, stored as PHC strings.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};

pub fn hash_new(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

pub fn check(password: &str, phc: &str) -> Result<()> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| anyhow!("stored password hash is malformed: {e}"))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| anyhow!("wrong password"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_accepts_the_right_password() {
        let hashed = hash_new("hunter2").unwrap();
        assert!(check("hunter2", &hashed).is_ok());
        assert!(check("hunter3", &hashed).is_err());
    }

    #[test]
    fn test_hash_is_an_argon2id_phc_string() {
        let hashed = hash_new("hunter2").unwrap();
        assert!(hashed.starts_with("$argon2id$"));
        assert!(!hashed.contains("hunter2"));
    }

    #[test]
    fn test_same_password_gets_a_fresh_salt() {
        let a = hash_new("same").unwrap();
        let b = hash_new("same").unwrap();
        assert_ne!(a, b);
        assert!(check("same", &a).is_ok());
        assert!(check("same", &b).is_ok());
    }

    #[test]
    fn test_malformed_hash_is_rejected() {
        assert!(check("hunter2", "not a phc string").is_err());
    }
}
