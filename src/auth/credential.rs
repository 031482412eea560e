//! Salted password hashing
//!
//! Stored form is `salt ‖ digest`: a 16-byte random salt followed by a
//! 32-byte PBKDF2-HMAC-SHA256 digest. The salt travels with the hash, so
//! verification needs nothing but the stored bytes.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;

pub const SALT_LEN: usize = 16;
pub const DIGEST_LEN: usize = 32;
/// Lowest iteration count accepted from configuration
pub const MIN_ROUNDS: u32 = 100_000;
pub const DEFAULT_ROUNDS: u32 = MIN_ROUNDS;

/// A stored password hash (`salt ‖ digest`). Never holds plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(Vec<u8>);

impl PasswordHash {
    /// Wrap bytes read back from storage
    pub fn from_stored(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn salt(&self) -> Option<&[u8]> {
        self.0.get(..SALT_LEN)
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordHash(<{} bytes>)", self.0.len())
    }
}

/// Hashes and verifies passwords with a fixed iteration count.
#[derive(Debug, Clone, Copy)]
pub struct CredentialService {
    rounds: u32,
}

impl Default for CredentialService {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
        }
    }
}

impl CredentialService {
    /// Use an explicit iteration count. Hashes made with one count only
    /// verify under the same count.
    pub fn with_rounds(rounds: u32) -> Self {
        Self {
            rounds: rounds.max(1),
        }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Hash `password`, drawing a fresh salt from the OS RNG unless one is given
    pub fn hash(&self, password: &str, salt: Option<[u8; SALT_LEN]>) -> PasswordHash {
        let salt = salt.unwrap_or_else(|| {
            let mut fresh = [0u8; SALT_LEN];
            OsRng.fill_bytes(&mut fresh);
            fresh
        });

        let mut digest = [0u8; DIGEST_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, self.rounds, &mut digest);

        let mut stored = Vec::with_capacity(SALT_LEN + DIGEST_LEN);
        stored.extend_from_slice(&salt);
        stored.extend_from_slice(&digest);
        PasswordHash(stored)
    }

    /// Re-derive the hash of `candidate` with the stored salt and compare
    pub fn verify(&self, stored: &PasswordHash, candidate: &str) -> bool {
        if stored.0.len() != SALT_LEN + DIGEST_LEN {
            return false;
        }
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(&stored.0[..SALT_LEN]);
        let derived = self.hash(candidate, Some(salt));
        constant_time_eq(&derived.0, &stored.0)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Hash with the default iteration count
pub fn hash_password(password: &str) -> PasswordHash {
    CredentialService::default().hash(password, None)
}

/// Verify with the default iteration count
pub fn verify_password(stored: &PasswordHash, candidate: &str) -> bool {
    CredentialService::default().verify(stored, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_default_rounds() {
        let stored = hash_password("secret");
        assert_eq!(stored.as_bytes().len(), SALT_LEN + DIGEST_LEN);
        assert!(verify_password(&stored, "secret"));
        assert!(!verify_password(&stored, "wrong"));
    }

    #[test]
    fn test_fresh_salt_each_time() {
        let svc = CredentialService::with_rounds(1_000);
        let a = svc.hash("secret", None);
        let b = svc.hash("secret", None);
        assert_ne!(a, b);
        assert_ne!(a.salt(), b.salt());
        assert!(svc.verify(&a, "secret"));
        assert!(svc.verify(&b, "secret"));
    }

    #[test]
    fn test_fixed_salt_is_deterministic() {
        let svc = CredentialService::with_rounds(1_000);
        let salt = [9u8; SALT_LEN];
        let a = svc.hash("secret", Some(salt));
        let b = svc.hash("secret", Some(salt));
        assert_eq!(a, b);
        assert_eq!(a.salt(), Some(&salt[..]));
    }

    #[test]
    fn test_stored_value_is_not_plaintext() {
        let svc = CredentialService::with_rounds(1_000);
        let stored = svc.hash("secret", None);
        assert!(!stored
            .as_bytes()
            .windows("secret".len())
            .any(|w| w == b"secret"));
        assert!(!format!("{:?}", stored).contains("secret"));
    }

    #[test]
    fn test_malformed_stored_value_never_verifies() {
        let svc = CredentialService::with_rounds(1_000);
        assert!(!svc.verify(&PasswordHash::from_stored(vec![1, 2, 3]), "secret"));
        assert!(!svc.verify(&PasswordHash::from_stored(Vec::new()), ""));
    }

    #[test]
    fn test_rounds_must_match() {
        let stored = CredentialService::with_rounds(1_000).hash("secret", None);
        assert!(!CredentialService::with_rounds(2_000).verify(&stored, "secret"));
    }
}
