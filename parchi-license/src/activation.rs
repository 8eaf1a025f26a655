//! Activation lifecycle: activate, verify, query, clear, migrate.
//!
//! [`LicenseManager`] owns the license bundle exclusively. The bundle
//! is persisted only in sealed form; the legacy plaintext markers from
//! the v1 format are written for migration detection and are never
//! trusted as the sole basis for an "active" decision.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use parchi_store::KvStore;

use crate::config::SecretConfig;
use crate::device::DeviceFingerprint;
use crate::digest::KeyedDigest;
use crate::envelope::StorageEnvelope;
use crate::error::LicenseResult;
use crate::key::{KeyCheck, KeyScheme};

/// Storage keys owned by the license core.
pub mod keys {
    /// The sealed license bundle (the authoritative record).
    pub const BUNDLE: &str = "license.bundle";
    /// Secondary integrity digest stored beside the bundle.
    pub const INTEGRITY: &str = "license.integrity";
    /// Legacy activation flag; holds [`super::LEGACY_ACTIVE`].
    pub const LEGACY_FLAG: &str = "license.flag";
    /// Legacy plaintext business name.
    pub const LEGACY_BUSINESS: &str = "license.business";
    /// Legacy plaintext expiry, epoch millis as a string.
    pub const LEGACY_EXPIRY: &str = "license.expiry";
    /// Install date marker, epoch millis as a string.
    pub const INSTALL_DATE: &str = "license.installed";
    /// Cached 8-char display device id.
    pub const SHORT_DEVICE_ID: &str = "device.short_id";
}

/// Value the legacy flag holds after activation or migration.
pub const LEGACY_ACTIVE: &str = "active_v2";

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// The authoritative activation record.
///
/// Persisted only inside a sealed envelope; replaced whole on
/// re-activation, never merged. Serde names keep the persisted JSON
/// compatible with bundles written by earlier releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseBundle {
    /// Whether the license is active.
    pub active: bool,
    /// Uppercased business name.
    #[serde(rename = "bizName")]
    pub business_name: String,
    /// Expiry instant, epoch millis.
    #[serde(rename = "expiry")]
    pub expiry_ms: i64,
    /// Activation instant, epoch millis.
    #[serde(rename = "activatedAt")]
    pub activated_at_ms: i64,
    /// The fingerprint this bundle is bound to.
    #[serde(rename = "deviceFingerprint")]
    pub device_fingerprint: DeviceFingerprint,
    /// Bundle schema version.
    #[serde(rename = "version")]
    pub schema_version: String,
}

/// Read-only projection of the active license for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseInfo {
    /// Local calendar day the license expires.
    pub expiry_date: NaiveDate,
    /// Whole days remaining, rounded up; negative when past expiry.
    pub days_remaining: i64,
    /// True when 1–7 days (inclusive) remain.
    pub is_expiring_soon: bool,
    /// Local calendar day of activation, when known.
    pub activated_at: Option<NaiveDate>,
}

/// Outcome of a watchdog verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// No sealed bundle exists; nothing to protect yet.
    Unactivated,
    /// The bundle opened, matched this device and has not expired.
    Ok,
    /// A bundle exists but failed verification.
    Tampered,
}

/// Orchestrates the activation lifecycle over a [`KvStore`].
///
/// Constructed once at process start; otherwise stateless — every
/// verification recomputes the device fingerprint rather than trusting
/// anything read from storage alone.
pub struct LicenseManager {
    store: Arc<dyn KvStore>,
    digest: KeyedDigest,
    envelope: StorageEnvelope,
    scheme: KeyScheme,
    config: SecretConfig,
}

impl LicenseManager {
    /// Creates a manager over `store` with the embedded secrets.
    #[must_use]
    pub fn new(store: Arc<dyn KvStore>, config: SecretConfig) -> Self {
        Self {
            digest: KeyedDigest::new(&config),
            envelope: StorageEnvelope::new(&config),
            scheme: KeyScheme::new(&config),
            store,
            config,
        }
    }

    /// Freshly computed fingerprint for the current device.
    fn fingerprint(&self) -> DeviceFingerprint {
        DeviceFingerprint::generate(&self.digest)
    }

    /// The full fingerprint hex string, recomputed fresh.
    #[must_use]
    pub fn full_fingerprint(&self) -> String {
        self.fingerprint().as_str().to_string()
    }

    /// The 8-char uppercase device id shown to the user, derived once
    /// and cached in the store thereafter.
    pub fn display_device_id(&self) -> LicenseResult<String> {
        if let Some(id) = self.store.get(keys::SHORT_DEVICE_ID) {
            return Ok(id);
        }
        let id = self.fingerprint().short_id();
        self.store.set(keys::SHORT_DEVICE_ID, &id)?;
        Ok(id)
    }

    /// Issues a key for an arbitrary device/business/expiry. Issuer
    /// tooling only; not part of the end-user flow.
    #[must_use]
    pub fn issue_key(&self, device_id: &str, business_name: &str, expiry: NaiveDate) -> String {
        self.scheme.issue(device_id, business_name, expiry)
    }

    /// Validates an entered license key against this device.
    #[must_use]
    pub fn validate_key(&self, device_id: &str, business_name: &str, entered: &str) -> KeyCheck {
        self.scheme.validate(device_id, business_name, entered)
    }

    /// Supplementary digest stored beside the envelope: bundle JSON,
    /// fingerprint and a whole-seconds timestamp, keyed-digested.
    /// Stored metadata only — no trust decision recomputes it; the
    /// envelope checksum is the verified signal.
    fn integrity_hash(&self, bundle_json: &str, fingerprint: &DeviceFingerprint) -> String {
        let coarse_secs = Utc::now().timestamp();
        self.digest.hex_digest(&format!(
            "{bundle_json}{}{}{coarse_secs}",
            fingerprint.as_str(),
            self.config.secret
        ))
    }

    /// Activates the license: seals a fresh bundle bound to the current
    /// fingerprint and persists it with its integrity hash and the
    /// legacy compat markers.
    ///
    /// Atomic with respect to failure: if sealing fails, nothing is
    /// written and any previous bundle stays intact.
    pub fn activate(&self, business_name: &str, expiry_ms: i64) -> LicenseResult<()> {
        let fingerprint = self.fingerprint();
        let now_ms = Utc::now().timestamp_millis();
        let bundle = LicenseBundle {
            active: true,
            business_name: business_name.to_uppercase(),
            expiry_ms,
            activated_at_ms: now_ms,
            device_fingerprint: fingerprint.clone(),
            schema_version: self.config.schema_version.clone(),
        };

        let sealed = self.envelope.seal(&bundle, &fingerprint)?;
        let bundle_json = serde_json::to_string(&bundle)?;
        let integrity = self.integrity_hash(&bundle_json, &fingerprint);

        self.store.set(keys::BUNDLE, &sealed)?;
        self.store.set(keys::INTEGRITY, &integrity)?;
        self.store.set(keys::LEGACY_FLAG, LEGACY_ACTIVE)?;
        self.store.set(keys::LEGACY_BUSINESS, &bundle.business_name)?;
        self.store.set(keys::LEGACY_EXPIRY, &expiry_ms.to_string())?;
        self.store.set(keys::INSTALL_DATE, &now_ms.to_string())?;

        info!(business = %bundle.business_name, "license activated");
        Ok(())
    }

    /// Opens the sealed bundle with a fresh fingerprint.
    fn open_bundle(&self) -> Option<(LicenseBundle, DeviceFingerprint)> {
        let sealed = self.store.get(keys::BUNDLE)?;
        let fingerprint = self.fingerprint();
        let bundle = self.envelope.open(&sealed, &fingerprint)?;
        Some((bundle, fingerprint))
    }

    /// Re-verifies the sealed bundle against the current device:
    /// envelope opens, bound fingerprint equals a freshly computed one,
    /// and the expiry instant has not passed.
    #[must_use]
    pub fn verify_integrity(&self) -> bool {
        if self.store.get(keys::BUNDLE).is_none() || self.store.get(keys::INTEGRITY).is_none() {
            return false;
        }
        let Some((bundle, fingerprint)) = self.open_bundle() else {
            error!("sealed license bundle failed to open");
            return false;
        };
        if bundle.device_fingerprint != fingerprint {
            error!("device fingerprint mismatch");
            return false;
        }
        if bundle.expiry_ms > 0 && Utc::now().timestamp_millis() > bundle.expiry_ms {
            warn!("license expired");
            return false;
        }
        true
    }

    /// Verification verdict for the tamper watchdog. An absent bundle
    /// is reported as [`Verdict::Unactivated`] rather than a failure so
    /// the watchdog never wipes a fresh install.
    #[must_use]
    pub fn tamper_verdict(&self) -> Verdict {
        if self.store.get(keys::BUNDLE).is_none() {
            return Verdict::Unactivated;
        }
        if self.verify_integrity() {
            Verdict::Ok
        } else {
            Verdict::Tampered
        }
    }

    /// Whether a valid, unexpired, device-bound license is active.
    ///
    /// With no sealed bundle present this falls back to the legacy
    /// plaintext markers, migrating them forward once. Any verification
    /// failure on a present bundle clears all license state and returns
    /// false, forcing re-activation.
    #[must_use]
    pub fn is_active(&self) -> bool {
        if self.store.get(keys::BUNDLE).is_none() {
            return self.migrate_legacy();
        }

        let ok = self.verify_integrity()
            && self
                .open_bundle()
                .is_some_and(|(bundle, _)| bundle.active);
        if !ok {
            error!("license check failed, clearing license state");
            self.clear();
        }
        ok
    }

    /// One-time forward migration from the legacy plaintext markers.
    /// Reports based on the legacy flag value.
    fn migrate_legacy(&self) -> bool {
        let Some(flag) = self.store.get(keys::LEGACY_FLAG) else {
            return false;
        };
        let expiry = self
            .store
            .get(keys::LEGACY_EXPIRY)
            .and_then(|v| v.parse::<i64>().ok());
        let business = self.store.get(keys::LEGACY_BUSINESS);
        if let (Some(expiry_ms), Some(business)) = (expiry, business) {
            info!("migrating legacy license markers to sealed bundle");
            if let Err(e) = self.activate(&business, expiry_ms) {
                warn!("legacy license migration failed: {e}");
            }
        }
        flag == LEGACY_ACTIVE
    }

    /// Read-only projection of expiry and activation dates, with legacy
    /// plaintext fallback when no sealed bundle exists.
    #[must_use]
    pub fn info(&self) -> Option<LicenseInfo> {
        if self.store.get(keys::BUNDLE).is_some() {
            let (bundle, _) = self.open_bundle()?;
            if bundle.expiry_ms == 0 {
                return None;
            }
            return project_info(bundle.expiry_ms, Some(bundle.activated_at_ms));
        }
        let expiry_ms = self.store.get(keys::LEGACY_EXPIRY)?.parse::<i64>().ok()?;
        project_info(expiry_ms, None)
    }

    /// The activated business name, from the sealed bundle when
    /// possible, falling back to the legacy plaintext marker.
    #[must_use]
    pub fn business_name(&self) -> Option<String> {
        if let Some((bundle, _)) = self.open_bundle() {
            return Some(bundle.business_name);
        }
        self.store.get(keys::LEGACY_BUSINESS)
    }

    /// Removes every license key. Idempotent; leaves the rest of the
    /// store untouched.
    pub fn clear(&self) {
        for key in [
            keys::BUNDLE,
            keys::INTEGRITY,
            keys::LEGACY_FLAG,
            keys::LEGACY_EXPIRY,
            keys::LEGACY_BUSINESS,
        ] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, "failed to remove license key: {e}");
            }
        }
    }

    /// Removes every key in the backing store, not just license state.
    /// The watchdog's remediation path.
    pub fn wipe_all(&self) {
        if let Err(e) = self.store.clear_all() {
            error!("failed to wipe local state: {e}");
        }
    }
}

/// Days-remaining projection against the current instant.
fn project_info(expiry_ms: i64, activated_at_ms: Option<i64>) -> Option<LicenseInfo> {
    let now_ms = Utc::now().timestamp_millis();
    let delta = expiry_ms - now_ms;
    let days_remaining = if delta > 0 {
        (delta + MS_PER_DAY - 1) / MS_PER_DAY
    } else {
        delta / MS_PER_DAY
    };
    Some(LicenseInfo {
        expiry_date: local_date(expiry_ms)?,
        days_remaining,
        is_expiring_soon: (1..=7).contains(&days_remaining),
        activated_at: activated_at_ms.and_then(local_date),
    })
}

fn local_date(ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(ms).map(|t| t.with_timezone(&Local).date_naive())
}
