//! Keyed one-way digest and XOR keystream derivation.
//!
//! Every hash in the license scheme is `sha256(input || secret)`,
//! rendered as lowercase hex, so outputs cannot be reproduced without
//! the embedded secret. The same digest doubles as a keystream source
//! for the storage envelope: successive two-hex-char windows, indexed
//! modulo the digest length, are reinterpreted as byte values.

use sha2::{Digest, Sha256};

use crate::config::SecretConfig;

/// Computes keyed digests over license inputs.
#[derive(Debug, Clone)]
pub struct KeyedDigest {
    secret: String,
}

impl KeyedDigest {
    /// Creates a digest bound to the configured secret.
    #[must_use]
    pub fn new(config: &SecretConfig) -> Self {
        Self {
            secret: config.secret.clone(),
        }
    }

    /// Returns `hex(sha256(input || secret))` — 64 lowercase hex chars.
    #[must_use]
    pub fn hex_digest(&self, input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Reads the keystream byte at position `i` from a hex digest string.
///
/// The byte is the two-hex-char window at `(2i mod len, 2i+1 mod len)`,
/// so the keystream repeats with the digest instead of truncating at
/// its end. `key_hex` must be non-empty ASCII hex.
#[must_use]
pub fn key_byte(key_hex: &str, i: usize) -> u8 {
    let bytes = key_hex.as_bytes();
    debug_assert!(!bytes.is_empty());
    let pair = [bytes[(i * 2) % bytes.len()], bytes[(i * 2 + 1) % bytes.len()]];
    std::str::from_utf8(&pair)
        .ok()
        .and_then(|s| u8::from_str_radix(s, 16).ok())
        .unwrap_or(0)
}
