//! Salted password hashing
//!
//! Stored form is `salt$digest`, both hex: a random 16-byte salt and
//! SHA-256 over salt bytes followed by the password. Verification
//! re-derives the digest and compares without short-circuiting.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = digest_with_salt(&salt, password);
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

/// Verify a password against a stored `salt$digest` hash.
///
/// Malformed stored values verify as false rather than erroring; a
/// corrupt hash should read as "wrong password", not a 500.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };

    let actual = digest_with_salt(&salt, password);
    constant_time_eq(&actual, &expected)
}

fn digest_with_salt(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Length check then full XOR fold, so timing does not leak the first
/// differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("flor-de-lis");
        assert!(verify_password("flor-de-lis", &hash));
        assert!(!verify_password("flor-de-liz", &hash));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password("siempre-listos");
        let b = hash_password("siempre-listos");
        assert_ne!(a, b);
        assert!(verify_password("siempre-listos", &a));
        assert!(verify_password("siempre-listos", &b));
    }

    #[test]
    fn stored_form_is_salt_dollar_digest() {
        let hash = hash_password("x");
        let (salt, digest) = hash.split_once('$').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(digest.len(), 64); // SHA-256 hex
    }

    #[test]
    fn malformed_stored_hash_verifies_false() {
        assert!(!verify_password("x", "no-dollar-sign"));
        assert!(!verify_password("x", "nothex$deadbeef"));
        assert!(!verify_password("x", "$"));
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
