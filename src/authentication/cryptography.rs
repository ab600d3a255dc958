//! Argon2 password hashes, stored in PHC string form.

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};

pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// `Ok(false)` means a wrong password; a stored value that is not a PHC hash is an error.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, HashError> {
    let stored = PasswordHash::new(stored)?;

    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_only_the_original_password() {
        let hash = hash_password("testpass123").unwrap();

        assert!(verify_password("testpass123", &hash).unwrap());
        assert!(!verify_password("wrongpass", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(
            hash_password("testpass123").unwrap(),
            hash_password("testpass123").unwrap()
        );
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("testpass123", "not-a-hash").is_err());
    }
}
