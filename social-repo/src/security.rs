//! Invitation token generation and hashing.

use rand::Rng;
use rand::distr::Alphanumeric;
use sha2::{Digest, Sha256};

const INVITATION_TOKEN_LEN: usize = 32;

/// Generates a random raw invitation token. Only its hash is ever stored.
pub fn generate_invitation_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Hashes a raw token using SHA-256 (hex encoded).
pub fn hash_token(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing() {
        let hash = hash_token("abc123");

        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("abc123"));
        assert_ne!(hash, hash_token("abc124"));
    }

    #[test]
    fn test_generated_tokens_differ() {
        let a = generate_invitation_token();
        let b = generate_invitation_token();

        assert_eq!(a.len(), INVITATION_TOKEN_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
