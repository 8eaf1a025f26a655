//! Licensing and activation for Parchi.
//!
//! This crate is the license-gating core of the offline-first ledger
//! app. It handles:
//! - Device fingerprinting from environment signals
//! - Keyed-digest license key issue and validation
//! - A device-bound, tamper-evident storage envelope for license data
//! - The activation lifecycle with legacy-format migration
//! - A periodic/interaction-triggered tamper watchdog
//!
//! # Design Principles
//!
//! - **Offline-first**: no network calls anywhere in this core
//! - **Device binding**: the sealed bundle only opens on the device
//!   whose fingerprint sealed it
//! - **Fail closed**: any integrity failure clears license state and
//!   forces re-activation; partial data is never returned
//! - **Not DRM**: a client running arbitrary code can defeat every
//!   check here; the goal is to raise the cost of casual tampering and
//!   license sharing, not provable security
//!
//! # License Key Format
//!
//! Keys are formatted as `YYYYMMDD-SIGNATURE`, where SIGNATURE is the
//! first 12 hex chars (uppercased) of the keyed digest over the device
//! id, business name and expiry date. The issuer recomputes keys from
//! the same inputs; nothing is stored server-side.

mod activation;
mod config;
mod device;
mod digest;
mod envelope;
mod error;
mod key;
mod watchdog;

pub use activation::{keys, LicenseBundle, LicenseInfo, LicenseManager, Verdict, LEGACY_ACTIVE};
pub use config::SecretConfig;
pub use device::{DeviceFingerprint, DeviceSignals};
pub use digest::{key_byte, KeyedDigest};
pub use envelope::{StorageEnvelope, CHECKSUM_PREFIX_LEN};
pub use error::{LicenseError, LicenseResult};
pub use key::{KeyCheck, KeyScheme, SIGNATURE_LEN};
pub use watchdog::{
    EntryPointRegistry, TamperHandler, Watchdog, EXPECTED_ENTRY_POINTS, INTERACTION_THROTTLE,
    PERIODIC_INTERVAL, RELOAD_DELAY,
};
