//! Device fingerprinting for license binding.
//!
//! The fingerprint is a keyed digest over a fixed, ordered list of
//! environment signals. It is stable across sessions for an unchanged
//! configuration; any changed signal (an OS update swapping the
//! renderer string, a renamed host) changes the fingerprint. That
//! false-positive risk is accepted — a mismatch forces re-activation.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

use crate::digest::KeyedDigest;

/// Delimiter between fingerprint components.
const COMPONENT_DELIMITER: &str = "|||";

/// Environment signals feeding the fingerprint, one per source.
///
/// Every signal is collected independently and is `None` when the host
/// cannot provide it; [`DeviceSignals::components`] substitutes a fixed
/// fallback literal per signal so fingerprint generation never fails.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSignals {
    /// Display geometry, e.g. `1920x1080`.
    pub display: Option<String>,
    /// Color depth in bits.
    pub color_depth: Option<u32>,
    /// Device pixel ratio.
    pub pixel_ratio: Option<f64>,
    /// Timezone offset in minutes, UTC minus local (positive west).
    pub timezone_offset_min: Option<i32>,
    /// Locale tag, e.g. `en_US`.
    pub locale: Option<String>,
    /// Logical core count.
    pub cores: Option<usize>,
    /// Platform string (OS and architecture).
    pub platform: Option<String>,
    /// Touch capability.
    pub touch: Option<bool>,
    /// Rendering-surface signature.
    pub surface: Option<String>,
    /// Graphics-renderer string.
    pub renderer: Option<String>,
    /// Host name.
    pub hostname: Option<String>,
    /// Platform machine identifier.
    pub machine_id: Option<String>,
}

impl DeviceSignals {
    /// Gathers every signal the current host can provide.
    #[must_use]
    pub fn collect() -> Self {
        Self {
            display: None,
            color_depth: None,
            pixel_ratio: None,
            timezone_offset_min: Some(local_timezone_offset_minutes()),
            locale: locale_from_env(),
            cores: std::thread::available_parallelism().ok().map(usize::from),
            platform: Some(format!("{} {}", env::consts::OS, env::consts::ARCH)),
            touch: None,
            surface: None,
            renderer: None,
            hostname: get_hostname(),
            machine_id: get_machine_id(),
        }
    }

    /// The ordered component list with per-signal fallback literals.
    ///
    /// The order, the fallbacks and the join delimiter are fixed:
    /// changing any of them changes every fingerprint in the field.
    #[must_use]
    pub fn components(&self) -> Vec<String> {
        vec![
            self.display.clone().unwrap_or_else(|| "unknown".to_string()),
            self.color_depth.map_or_else(|| "24".to_string(), |v| v.to_string()),
            self.pixel_ratio.map_or_else(|| "1".to_string(), |v| v.to_string()),
            self.timezone_offset_min.unwrap_or(0).to_string(),
            self.locale.clone().unwrap_or_else(|| "en".to_string()),
            self.cores.unwrap_or(4).to_string(),
            self.platform.clone().unwrap_or_else(|| "unknown".to_string()),
            (if self.touch.unwrap_or(false) { "1" } else { "0" }).to_string(),
            self.surface.clone().unwrap_or_else(|| "no-canvas".to_string()),
            self.renderer.clone().unwrap_or_else(|| "no-webgl".to_string()),
            self.hostname.clone().unwrap_or_else(|| "unknown".to_string()),
            self.machine_id.clone().unwrap_or_else(|| "unknown".to_string()),
        ]
    }
}

/// A stable pseudo-identity for this device configuration.
///
/// 64 lowercase hex chars. Always recomputed fresh for trust decisions;
/// the copy bound inside a license bundle is only ever compared against
/// a freshly generated one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFingerprint(String);

impl DeviceFingerprint {
    /// Generates the fingerprint for the current device.
    #[must_use]
    pub fn generate(digest: &KeyedDigest) -> Self {
        Self::from_signals(&DeviceSignals::collect(), digest)
    }

    /// Derives the fingerprint from an explicit signal set.
    #[must_use]
    pub fn from_signals(signals: &DeviceSignals, digest: &KeyedDigest) -> Self {
        let joined = signals.components().join(COMPONENT_DELIMITER);
        Self(digest.hex_digest(&joined))
    }

    /// Returns the fingerprint hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first 8 hex chars, uppercased — the human-readable device id
    /// shown on the activation screen.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.0.chars().take(8).collect::<String>().to_uppercase()
    }

    /// Returns true if a freshly generated fingerprint equals this one.
    #[must_use]
    pub fn matches_current(&self, digest: &KeyedDigest) -> bool {
        *self == Self::generate(digest)
    }
}

impl fmt::Display for DeviceFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Timezone offset in minutes, UTC minus local (positive west of UTC).
fn local_timezone_offset_minutes() -> i32 {
    -(chrono::Local::now().offset().local_minus_utc() / 60)
}

/// Locale from the usual environment variables, encoding suffix dropped.
fn locale_from_env() -> Option<String> {
    ["LC_ALL", "LC_MESSAGES", "LANG"]
        .iter()
        .find_map(|key| env::var(key).ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.split('.').next().unwrap_or_default().to_string())
}

fn get_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

/// Platform machine identifier, where the OS exposes one.
fn get_machine_id() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/etc/machine-id")
            .or_else(|_| std::fs::read_to_string("/var/lib/dbus/machine-id"))
            .ok()
            .map(|s| s.trim().to_string())
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("ioreg")
            .args(["-rd1", "-c", "IOPlatformExpertDevice"])
            .output()
            .ok()
            .and_then(|o| String::from_utf8(o.stdout).ok())
            .and_then(|output| {
                output
                    .lines()
                    .find(|l| l.contains("IOPlatformUUID"))
                    .and_then(|l| l.split('"').nth(3))
                    .map(String::from)
            })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        None
    }
}
