//! Device-bound storage envelope: XOR stream obfuscation plus an
//! integrity checksum, base64-wrapped into one opaque string.
//!
//! This is deliberately NOT a vetted cipher construction. The XOR
//! stream resists casual edits and keeps plaintext fields unreadable in
//! the persisted store; the checksum prefix is what actually makes
//! tampering detectable. Opening with the wrong fingerprint yields
//! garbage bytes that fail UTF-8/JSON decoding or the checksum,
//! indistinguishably from real corruption — that is the device-binding
//! property, and the none-on-any-mismatch policy is load-bearing.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::config::SecretConfig;
use crate::device::DeviceFingerprint;
use crate::digest::{key_byte, KeyedDigest};
use crate::error::LicenseResult;

/// Length of the stored checksum prefix, in hex chars.
pub const CHECKSUM_PREFIX_LEN: usize = 16;

/// The at-rest form. Field names stay short for compatibility with
/// previously persisted envelopes.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    /// Base64 cipher bytes.
    #[serde(rename = "d")]
    cipher: String,
    /// First 16 hex chars of the plaintext+fingerprint digest.
    #[serde(rename = "c")]
    checksum: String,
    /// Creation time, epoch millis.
    #[serde(rename = "t")]
    created_at_ms: i64,
}

/// Seals structured data into device-bound opaque strings and opens
/// them again with integrity verification.
#[derive(Debug, Clone)]
pub struct StorageEnvelope {
    digest: KeyedDigest,
    secret: String,
    salt: String,
}

impl StorageEnvelope {
    /// Creates an envelope bound to the configured secret and salt.
    #[must_use]
    pub fn new(config: &SecretConfig) -> Self {
        Self {
            digest: KeyedDigest::new(config),
            secret: config.secret.clone(),
            salt: config.salt.clone(),
        }
    }

    /// Key material digest for the XOR keystream: fingerprint, secret
    /// and salt concatenated, then keyed-digested.
    fn keystream_hex(&self, fingerprint: &DeviceFingerprint) -> String {
        let material = format!("{}{}{}", fingerprint.as_str(), self.secret, self.salt);
        self.digest.hex_digest(&material)
    }

    /// Seals `data` into an opaque string bound to `fingerprint`.
    ///
    /// Serializes to canonical JSON, XORs with the repeating keystream,
    /// and attaches the checksum prefix computed over the plaintext and
    /// fingerprint. On error nothing is produced, so callers persist
    /// nothing.
    pub fn seal<T: Serialize>(
        &self,
        data: &T,
        fingerprint: &DeviceFingerprint,
    ) -> LicenseResult<String> {
        let plaintext = serde_json::to_string(data)?;
        let key_hex = self.keystream_hex(fingerprint);
        let cipher: Vec<u8> = plaintext
            .bytes()
            .enumerate()
            .map(|(i, b)| b ^ key_byte(&key_hex, i))
            .collect();

        let checksum = self
            .digest
            .hex_digest(&format!("{plaintext}{}", fingerprint.as_str()));
        let envelope = Envelope {
            cipher: BASE64.encode(&cipher),
            checksum: checksum[..CHECKSUM_PREFIX_LEN].to_string(),
            created_at_ms: Utc::now().timestamp_millis(),
        };
        Ok(BASE64.encode(serde_json::to_string(&envelope)?))
    }

    /// Opens a sealed blob, returning `None` — never partial data — if
    /// the outer decode fails, the recovered bytes are not valid
    /// UTF-8/JSON, or the checksum prefix does not match.
    #[must_use]
    pub fn open<T: DeserializeOwned>(
        &self,
        blob: &str,
        fingerprint: &DeviceFingerprint,
    ) -> Option<T> {
        let outer = BASE64.decode(blob.trim()).ok()?;
        let envelope: Envelope = serde_json::from_slice(&outer).ok()?;
        let cipher = BASE64.decode(&envelope.cipher).ok()?;

        let key_hex = self.keystream_hex(fingerprint);
        let plain_bytes: Vec<u8> = cipher
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ key_byte(&key_hex, i))
            .collect();
        let plaintext = String::from_utf8(plain_bytes).ok()?;

        let expected = self
            .digest
            .hex_digest(&format!("{plaintext}{}", fingerprint.as_str()));
        if envelope.checksum.as_str() != &expected[..CHECKSUM_PREFIX_LEN] {
            warn!("envelope checksum mismatch, treating as invalid");
            return None;
        }

        serde_json::from_str(&plaintext).ok()
    }
}
