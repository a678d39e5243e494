//! Shared-secret credential for the scheduled refresh trigger

use sha2::{Digest, Sha256};

/// The configured cron secret, held only as its SHA-256 digest.
#[derive(Clone)]
pub struct CronSecret {
    digest: [u8; 32],
}

impl CronSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Self::hash(secret),
        }
    }

    fn hash(value: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(value.as_bytes());
        hasher.finalize().into()
    }

    /// Compare digests in constant time so the response time does not leak
    /// how much of the secret matched.
    pub fn verify(&self, presented: &str) -> bool {
        let presented = Self::hash(presented);
        self.digest
            .iter()
            .zip(presented.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    /// Check a raw `Authorization` header value.
    pub fn verify_header(&self, auth_header: &str) -> bool {
        extract_bearer_token(auth_header)
            .map(|token| self.verify(token))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for CronSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CronSecret(<redacted>)")
    }
}

pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").filter(|token| !token.is_empty())
}
