//! Credential verifier contract (C2).
//!
//! The room actor needs to hash a room password and later verify a
//! candidate password against the stored digest, without caring how
//! either is implemented. The concrete implementation (Argon2id) lives
//! in `poker-transport`, keeping `poker-core` free of any KDF
//! dependency.

/// A digest that embeds its own parameters, so `verify` never needs
/// external state beyond the digest string itself.
pub trait PasswordVerifier: Send + Sync {
    /// Hash a password into a self-describing digest. May fail if the
    /// underlying KDF rejects its inputs (e.g. pathological length).
    fn hash(&self, password: &str) -> Result<String, VerifierError>;

    /// Check a password against a previously produced digest. An empty
    /// or malformed digest always returns `false`, never errors.
    fn verify(&self, digest: &str, password: &str) -> bool;
}

#[derive(Debug, thiserror::Error)]
#[error("failed to hash password: {0}")]
pub struct VerifierError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoVerifier;

    impl PasswordVerifier for EchoVerifier {
        fn hash(&self, password: &str) -> Result<String, VerifierError> {
            if password.is_empty() {
                return Err(VerifierError("empty password".to_string()));
            }
            Ok(format!("echo:{password}"))
        }

        fn verify(&self, digest: &str, password: &str) -> bool {
            !digest.is_empty() && digest == format!("echo:{password}")
        }
    }

    #[test]
    fn verify_round_trips_through_hash() {
        let v = EchoVerifier;
        let digest = v.hash("pw").unwrap();
        assert!(v.verify(&digest, "pw"));
        assert!(!v.verify(&digest, "wrong"));
    }

    #[test]
    fn verify_of_empty_digest_is_false() {
        let v = EchoVerifier;
        assert!(!v.verify("", "pw"));
    }
}
