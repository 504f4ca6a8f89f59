//! Placeholder credential check.
//!
//! NOT a real authentication scheme: a client proves it knows a shared secret
//! by sending the hex SHA-256 digest of it. The matchmaker only depends on the
//! [`CredentialChecker`] capability, so a real check can replace this one.

use sha2::{Digest, Sha256};

use crate::config::matchmaking::TOKEN_LENGTH;

/// Decides whether a handshake token admits a client to the queue.
pub trait CredentialChecker: Send + Sync {
    fn check(&self, token: &[u8]) -> bool;
}

impl<F> CredentialChecker for F
where
    F: Fn(&[u8]) -> bool + Send + Sync,
{
    fn check(&self, token: &[u8]) -> bool {
        self(token)
    }
}

/// Token a client sends for `secret`. Always `TOKEN_LENGTH` bytes long.
pub fn issue_token(secret: &str) -> Vec<u8> {
    hex::encode(Sha256::digest(secret.as_bytes())).into_bytes()
}

/// Accepts exactly the token issued for one shared secret.
pub struct SharedSecretChecker {
    expected: Vec<u8>,
}

impl SharedSecretChecker {
    pub fn new(secret: &str) -> Self {
        Self {
            expected: issue_token(secret),
        }
    }
}

impl CredentialChecker for SharedSecretChecker {
    fn check(&self, token: &[u8]) -> bool {
        token.len() == TOKEN_LENGTH && token == self.expected.as_slice()
    }
}
