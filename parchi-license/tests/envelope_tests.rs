mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use common::{fingerprint_a, fingerprint_b, test_config};
use parchi_license::{LicenseBundle, StorageEnvelope, CHECKSUM_PREFIX_LEN};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn envelope() -> StorageEnvelope {
    StorageEnvelope::new(&test_config())
}

fn sample_bundle() -> LicenseBundle {
    LicenseBundle {
        active: true,
        business_name: "ACME STORE".to_string(),
        expiry_ms: 1_748_735_999_999,
        activated_at_ms: 1_735_689_600_000,
        device_fingerprint: fingerprint_a(),
        schema_version: "v2.0.0".to_string(),
    }
}

/// Decodes the outer wrapper, applies `f` to the envelope JSON, and
/// re-wraps. Used to corrupt specific fields.
fn rewrap(sealed: &str, f: impl FnOnce(&mut Value)) -> String {
    let outer = BASE64.decode(sealed).unwrap();
    let mut value: Value = serde_json::from_slice(&outer).unwrap();
    f(&mut value);
    BASE64.encode(serde_json::to_string(&value).unwrap())
}

fn flip_first_char(s: &str) -> String {
    let replacement = if s.starts_with('B') { 'C' } else { 'B' };
    format!("{replacement}{}", &s[1..])
}

// ── Round-trip ───────────────────────────────────────────────────

#[test]
fn seal_open_roundtrip() {
    let env = envelope();
    let bundle = sample_bundle();
    let sealed = env.seal(&bundle, &fingerprint_a()).unwrap();
    let opened: LicenseBundle = env.open(&sealed, &fingerprint_a()).unwrap();
    assert_eq!(opened, bundle);
}

#[test]
fn sealed_blob_is_opaque() {
    let env = envelope();
    let sealed = env.seal(&sample_bundle(), &fingerprint_a()).unwrap();
    // Neither the outer string nor the decoded envelope leaks plaintext.
    assert!(!sealed.contains("ACME"));
    let outer = String::from_utf8(BASE64.decode(&sealed).unwrap()).unwrap();
    assert!(!outer.contains("ACME"));
}

#[test]
fn envelope_carries_checksum_and_timestamp() {
    let env = envelope();
    let sealed = env.seal(&sample_bundle(), &fingerprint_a()).unwrap();
    let outer = BASE64.decode(&sealed).unwrap();
    let value: Value = serde_json::from_slice(&outer).unwrap();
    assert_eq!(value["c"].as_str().unwrap().len(), CHECKSUM_PREFIX_LEN);
    assert!(value["t"].as_i64().unwrap() > 0);
    assert!(!value["d"].as_str().unwrap().is_empty());
}

// ── Device binding ───────────────────────────────────────────────

#[test]
fn wrong_fingerprint_fails_to_open() {
    let env = envelope();
    let sealed = env.seal(&sample_bundle(), &fingerprint_a()).unwrap();
    assert_eq!(env.open::<LicenseBundle>(&sealed, &fingerprint_b()), None);
}

// ── Tamper sensitivity ───────────────────────────────────────────

#[test]
fn cipher_tampering_is_detected() {
    let env = envelope();
    let sealed = env.seal(&sample_bundle(), &fingerprint_a()).unwrap();
    let tampered = rewrap(&sealed, |v| {
        let cipher = v["d"].as_str().unwrap().to_string();
        v["d"] = Value::String(flip_first_char(&cipher));
    });
    assert_eq!(env.open::<LicenseBundle>(&tampered, &fingerprint_a()), None);
}

#[test]
fn checksum_tampering_is_detected() {
    let env = envelope();
    let sealed = env.seal(&sample_bundle(), &fingerprint_a()).unwrap();
    let tampered = rewrap(&sealed, |v| {
        let checksum = v["c"].as_str().unwrap().to_string();
        v["c"] = Value::String(flip_first_char(&checksum));
    });
    assert_eq!(env.open::<LicenseBundle>(&tampered, &fingerprint_a()), None);
}

// ── Malformed input ──────────────────────────────────────────────

#[test]
fn garbage_input_opens_to_none() {
    let env = envelope();
    assert_eq!(env.open::<Value>("definitely not base64 !!!", &fingerprint_a()), None);
    assert_eq!(env.open::<Value>("", &fingerprint_a()), None);
}

#[test]
fn valid_base64_of_non_json_opens_to_none() {
    let env = envelope();
    let blob = BASE64.encode("this is not an envelope");
    assert_eq!(env.open::<Value>(&blob, &fingerprint_a()), None);
}

#[test]
fn type_mismatch_opens_to_none() {
    let env = envelope();
    let sealed = env.seal(&vec![1, 2, 3], &fingerprint_a()).unwrap();
    // The plaintext is a JSON array, not a bundle.
    assert_eq!(env.open::<LicenseBundle>(&sealed, &fingerprint_a()), None);
}

#[test]
fn arbitrary_json_roundtrip() {
    let env = envelope();
    let data = serde_json::json!({
        "nested": { "values": ["a", "b"], "count": 2 },
        "flag": true,
    });
    let sealed = env.seal(&data, &fingerprint_a()).unwrap();
    let opened: Value = env.open(&sealed, &fingerprint_a()).unwrap();
    assert_eq!(opened, data);
}
