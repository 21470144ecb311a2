/// One-time tokens for email verification and password reset
///
/// The plaintext token is only ever sent to the user (inside a link); the
/// database keeps its SHA-256 hex digest and an expiry. Looking a token up
/// therefore means hashing what the client presents and searching by hash.
///
/// The same digest is used to store the current refresh token of a user.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::tokens::{generate_temporary_token, hash_token};
///
/// let token = generate_temporary_token();
/// assert_eq!(token.unhashed.len(), 40);
/// assert_eq!(hash_token(&token.unhashed), token.hashed);
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes per token (hex encoded to 40 characters)
const TOKEN_BYTES: usize = 20;

/// How long a verification or reset link stays valid
pub const TEMPORARY_TOKEN_TTL_MINUTES: i64 = 20;

/// A freshly generated one-time token
#[derive(Debug, Clone)]
pub struct TemporaryToken {
    /// Sent to the user, never stored
    pub unhashed: String,

    /// SHA-256 hex digest, stored
    pub hashed: String,

    /// Instant after which the token is rejected
    pub expires_at: DateTime<Utc>,
}

/// Generates a random one-time token that expires in 20 minutes
pub fn generate_temporary_token() -> TemporaryToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);

    let unhashed = hex::encode(bytes);
    let hashed = hash_token(&unhashed);

    TemporaryToken {
        unhashed,
        hashed,
        expires_at: Utc::now() + Duration::minutes(TEMPORARY_TOKEN_TTL_MINUTES),
    }
}

/// SHA-256 hex digest of a token (64 characters)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a presented token against a stored digest in constant time
pub fn verify_token(token: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_token(token).as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens_are_unique_hex() {
        let first = generate_temporary_token();
        let second = generate_temporary_token();

        assert_ne!(first.unhashed, second.unhashed);
        assert!(first.unhashed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first.hashed.len(), 64);
    }

    #[test]
    fn test_expiry_is_twenty_minutes_out() {
        let token = generate_temporary_token();
        let remaining = token.expires_at - Utc::now();

        assert!(remaining <= Duration::minutes(20));
        assert!(remaining > Duration::minutes(19));
    }

    #[test]
    fn test_hash_token_known_vector() {
        // sha256("abc")
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_token() {
        let token = generate_temporary_token();

        assert!(verify_token(&token.unhashed, &token.hashed));
        assert!(!verify_token("tampered", &token.hashed));
        assert!(!verify_token(&token.unhashed, "short"));
    }
}
