//! Shared test helpers for license tests.

#![allow(dead_code)]

use std::sync::Arc;

use parchi_license::{
    DeviceFingerprint, DeviceSignals, KeyedDigest, LicenseManager, SecretConfig,
};
use parchi_store::{KvStore, MemoryStore};

pub fn test_config() -> SecretConfig {
    SecretConfig::default()
}

pub fn test_digest() -> KeyedDigest {
    KeyedDigest::new(&test_config())
}

/// A manager over a fresh in-memory store, returned alongside the store
/// so tests can inspect and corrupt persisted state directly.
pub fn make_manager() -> (Arc<MemoryStore>, LicenseManager) {
    let store = Arc::new(MemoryStore::new());
    let manager = LicenseManager::new(Arc::clone(&store) as Arc<dyn KvStore>, test_config());
    (store, manager)
}

/// A fixed signal set standing in for one shop-counter device.
pub fn signals_a() -> DeviceSignals {
    DeviceSignals {
        display: Some("1920x1080".to_string()),
        color_depth: Some(24),
        pixel_ratio: Some(1.0),
        timezone_offset_min: Some(-330),
        locale: Some("en_IN".to_string()),
        cores: Some(8),
        platform: Some("linux x86_64".to_string()),
        touch: Some(false),
        surface: None,
        renderer: None,
        hostname: Some("shop-counter".to_string()),
        machine_id: Some("4f1d2c9ab8e34d56".to_string()),
    }
}

/// Same device with one changed signal (a different core count).
pub fn signals_b() -> DeviceSignals {
    DeviceSignals {
        cores: Some(4),
        ..signals_a()
    }
}

pub fn fingerprint_a() -> DeviceFingerprint {
    DeviceFingerprint::from_signals(&signals_a(), &test_digest())
}

pub fn fingerprint_b() -> DeviceFingerprint {
    DeviceFingerprint::from_signals(&signals_b(), &test_digest())
}
