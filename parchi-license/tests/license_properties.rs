//! Property-based tests for the license core.
//!
//! These verify the properties the rest of the app leans on:
//! - Sealing is reversible with the same fingerprint
//! - The wrong fingerprint never opens an envelope
//! - Issued keys always validate before their expiry date

mod common;

use chrono::{Days, NaiveDate};
use common::{fingerprint_a, fingerprint_b, test_config};
use parchi_license::{KeyScheme, LicenseBundle, StorageEnvelope};
use proptest::prelude::*;

fn business_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9 ]{1,40}").unwrap()
}

fn device_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-F0-9]{8}").unwrap()
}

fn bundle_strategy() -> impl Strategy<Value = LicenseBundle> {
    (
        any::<bool>(),
        business_strategy(),
        0i64..4_102_444_800_000,
        0i64..4_102_444_800_000,
    )
        .prop_map(|(active, business_name, expiry_ms, activated_at_ms)| LicenseBundle {
            active,
            business_name,
            expiry_ms,
            activated_at_ms,
            device_fingerprint: fingerprint_a(),
            schema_version: "v2.0.0".to_string(),
        })
}

proptest! {
    #[test]
    fn seal_open_roundtrip(bundle in bundle_strategy()) {
        let env = StorageEnvelope::new(&test_config());
        let sealed = env.seal(&bundle, &fingerprint_a()).unwrap();
        let opened: LicenseBundle = env.open(&sealed, &fingerprint_a()).unwrap();
        prop_assert_eq!(opened, bundle);
    }

    #[test]
    fn wrong_fingerprint_never_opens(bundle in bundle_strategy()) {
        let env = StorageEnvelope::new(&test_config());
        let sealed = env.seal(&bundle, &fingerprint_a()).unwrap();
        prop_assert_eq!(env.open::<LicenseBundle>(&sealed, &fingerprint_b()), None);
    }

    #[test]
    fn issued_keys_validate_before_expiry(
        device in device_strategy(),
        business in business_strategy(),
        days_out in 1u64..3650,
    ) {
        let scheme = KeyScheme::new(&test_config());
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let expiry = today.checked_add_days(Days::new(days_out)).unwrap();
        let key = scheme.issue(&device, &business, expiry);
        let now = today.and_hms_opt(12, 0, 0).unwrap();
        prop_assert!(scheme.validate_at(&device, &business, &key, now).is_valid());
    }

    #[test]
    fn validate_never_panics_on_arbitrary_input(
        key in prop::string::string_regex("[ -~]{0,64}").unwrap(),
    ) {
        let scheme = KeyScheme::new(&test_config());
        let _ = scheme.validate("ABCD1234", "ACME STORE", &key);
    }
}
