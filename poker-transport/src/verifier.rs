//! Argon2id implementation of `poker_core::verifier::PasswordVerifier`.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier as _};
use password_hash::{rand_core::OsRng, SaltString};
use poker_core::verifier::{PasswordVerifier, VerifierError};

#[derive(Debug, Default)]
pub struct Argon2Verifier {
    argon2: Argon2<'static>,
}

impl Argon2Verifier {
    pub fn new() -> Self {
        Argon2Verifier::default()
    }
}

impl PasswordVerifier for Argon2Verifier {
    fn hash(&self, password: &str) -> Result<String, VerifierError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| VerifierError(e.to_string()))
    }

    fn verify(&self, digest: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return false;
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let v = Argon2Verifier::new();
        let digest = v.hash("hunter2").unwrap();
        assert!(v.verify(&digest, "hunter2"));
        assert!(!v.verify(&digest, "wrong"));
    }

    #[test]
    fn malformed_digest_never_verifies() {
        let v = Argon2Verifier::new();
        assert!(!v.verify("not a phc string", "anything"));
    }

    #[test]
    fn two_hashes_of_the_same_password_differ_by_salt() {
        let v = Argon2Verifier::new();
        let a = v.hash("hunter2").unwrap();
        let b = v.hash("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(v.verify(&a, "hunter2"));
        assert!(v.verify(&b, "hunter2"));
    }
}
