//! Key secret generation

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Generator for random key secrets
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    /// Prefix for all generated secrets (e.g., "gk_")
    prefix: String,
    /// Number of random bytes to generate
    secret_bytes: usize,
}

impl SecretGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            secret_bytes: 32,
        }
    }

    pub fn generate(&self) -> String {
        let mut random_bytes = vec![0u8; self.secret_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(&random_bytes))
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::new("gk_")
    }
}
