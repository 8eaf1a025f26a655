//! Date-based license keys: `YYYYMMDD-SIGNATURE`.
//!
//! The signature is the first 12 hex chars, uppercased, of the keyed
//! digest over `DEVICE|BUSINESS|YYYYMMDD|secret`, where DEVICE is the
//! uppercased device id and BUSINESS is the uppercased business name
//! with all whitespace removed. No randomness and no counter: identical
//! inputs always produce the identical key, so the issuer recomputes
//! keys out-of-band instead of storing a catalogue.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::config::SecretConfig;
use crate::digest::KeyedDigest;

/// Length of the signature segment, in hex chars.
pub const SIGNATURE_LEN: usize = 12;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Outcome of validating an entered license key.
///
/// The checks run in order and short-circuit; each failure carries its
/// own classification. Signature mismatch deliberately reports the same
/// message for a forged key and a wrong device/business, so a probe
/// cannot tell which check failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyCheck {
    /// Key is authentic and unexpired.
    Valid {
        /// The calendar day the key expires at the end of.
        expiry_date: NaiveDate,
        /// Whole days remaining, rounded up.
        days_remaining: i64,
    },
    /// The key does not split into a date and a signature segment.
    InvalidFormat,
    /// The date segment is not eight digits forming a calendar date.
    InvalidDate,
    /// The recomputed signature does not match.
    InvalidKey,
    /// Authentic, but past the end of its expiry day.
    Expired {
        /// The calendar day the key expired at the end of.
        expiry_date: NaiveDate,
        /// Whole days elapsed since expiry, rounded down.
        expired_days: i64,
    },
}

impl KeyCheck {
    /// Returns true for [`KeyCheck::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// The user-facing message for a failed check, `None` when valid.
    #[must_use]
    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Valid { .. } => None,
            Self::InvalidFormat => Some("Invalid key format"),
            Self::InvalidDate => Some("Invalid date format"),
            Self::InvalidKey => Some("Invalid license key"),
            Self::Expired { .. } => Some("License expired"),
        }
    }
}

/// Issues and validates license keys.
#[derive(Debug, Clone)]
pub struct KeyScheme {
    digest: KeyedDigest,
    secret: String,
}

impl KeyScheme {
    /// Creates a scheme bound to the configured secret.
    #[must_use]
    pub fn new(config: &SecretConfig) -> Self {
        Self {
            digest: KeyedDigest::new(config),
            secret: config.secret.clone(),
        }
    }

    /// Canonicalization: device id uppercased (whitespace kept),
    /// business name uppercased with all whitespace removed.
    fn signature(&self, device_id: &str, business_name: &str, date_str: &str) -> String {
        let business: String = business_name
            .to_uppercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let combined = format!(
            "{}|{}|{}|{}",
            device_id.to_uppercase(),
            business,
            date_str,
            self.secret
        );
        self.digest.hex_digest(&combined)[..SIGNATURE_LEN].to_uppercase()
    }

    /// Issues the key for `(device_id, business_name, expiry)`.
    ///
    /// Deterministic; meant to be run by the license issuer out-of-band,
    /// not exposed to the end-user UI.
    #[must_use]
    pub fn issue(&self, device_id: &str, business_name: &str, expiry: NaiveDate) -> String {
        let date_str = expiry.format("%Y%m%d").to_string();
        let signature = self.signature(device_id, business_name, &date_str);
        format!("{date_str}-{signature}")
    }

    /// Validates an entered key against the current local wall-clock.
    #[must_use]
    pub fn validate(&self, device_id: &str, business_name: &str, entered_key: &str) -> KeyCheck {
        self.validate_at(device_id, business_name, entered_key, Local::now().naive_local())
    }

    /// Validates an entered key at an explicit local wall-clock instant.
    ///
    /// A key is valid through the entire calendar day it encodes: it
    /// expires at 23:59:59.999 local time, not at the issuing instant.
    #[must_use]
    pub fn validate_at(
        &self,
        device_id: &str,
        business_name: &str,
        entered_key: &str,
        now: NaiveDateTime,
    ) -> KeyCheck {
        let key = entered_key.trim().to_uppercase();
        let parts: Vec<&str> = key.split('-').collect();
        if parts.len() != 2 {
            return KeyCheck::InvalidFormat;
        }
        let (date_str, provided_signature) = (parts[0], parts[1]);

        if date_str.len() != 8 || !date_str.bytes().all(|b| b.is_ascii_digit()) {
            return KeyCheck::InvalidDate;
        }

        // Signature first: a forged date segment must not leak whether
        // the date itself would have parsed.
        let expected = self.signature(device_id, business_name, date_str);
        if provided_signature != expected {
            return KeyCheck::InvalidKey;
        }

        let Some(expiry_date) = parse_date_segment(date_str) else {
            return KeyCheck::InvalidDate;
        };

        let end_of_day = NaiveDateTime::new(
            expiry_date,
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or_default(),
        );

        if now > end_of_day {
            let expired_days = (now - end_of_day).num_days();
            return KeyCheck::Expired {
                expiry_date,
                expired_days,
            };
        }

        KeyCheck::Valid {
            expiry_date,
            days_remaining: days_ceil(end_of_day - now),
        }
    }
}

fn parse_date_segment(date_str: &str) -> Option<NaiveDate> {
    let year: i32 = date_str.get(0..4)?.parse().ok()?;
    let month: u32 = date_str.get(4..6)?.parse().ok()?;
    let day: u32 = date_str.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Whole days in `delta`, rounded up.
fn days_ceil(delta: TimeDelta) -> i64 {
    let ms = delta.num_milliseconds();
    if ms <= 0 {
        return 0;
    }
    (ms + MS_PER_DAY - 1) / MS_PER_DAY
}
