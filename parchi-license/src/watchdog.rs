//! Tamper-detection watchdog.
//!
//! Two independent triggers re-run the envelope verification path: a
//! fixed 30-second interval task and a throttled per-interaction check
//! (at most once per 60 seconds of wall-clock time, regardless of how
//! often the host reports interactions). A failed check is treated as
//! tampering and the remediation is deliberately destructive: blocking
//! notice, full wipe of the local store, host reload after a short
//! delay. A false positive — say a fingerprint-affecting environment
//! change — is indistinguishable from real tampering and pays the same
//! cost.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::activation::{LicenseManager, Verdict};

/// Interval between periodic checks. The first check fires a full
/// interval after startup, so the initial `is_active` decision always
/// lands before any watchdog side effect.
pub const PERIODIC_INTERVAL: Duration = Duration::from_secs(30);

/// Minimum wall-clock gap between interaction-triggered checks.
pub const INTERACTION_THROTTLE: Duration = Duration::from_secs(60);

/// Delay between the blocking notice and the reload request.
pub const RELOAD_DELAY: Duration = Duration::from_secs(2);

/// Entry points every running host is expected to have registered.
pub const EXPECTED_ENTRY_POINTS: &[&str] =
    &["save_transaction", "render_ledger", "attempt_activation"];

const TAMPER_NOTICE: &str = "Security Error: License data was modified. Please restart the app.";

/// Host-side effects of a tamper verdict.
pub trait TamperHandler: Send + Sync {
    /// Surface a blocking notice to the user.
    fn notify(&self, message: &str);
    /// Request a full host reload.
    fn reload(&self);
}

/// Registry of named host entry points for the weak code-tamper
/// heuristic: the host registers its entry points at startup and the
/// watchdog checks that the expected names are all still present.
#[derive(Debug, Default)]
pub struct EntryPointRegistry {
    registered: Mutex<HashSet<String>>,
}

impl EntryPointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named entry point.
    pub fn register(&self, name: &str) {
        self.lock().insert(name.to_string());
    }

    /// Removes a named entry point.
    pub fn unregister(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Returns false if any expected name is missing.
    #[must_use]
    pub fn check(&self, expected: &[&str]) -> bool {
        let registered = self.lock();
        expected.iter().all(|name| registered.contains(*name))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The background verification task and its interaction-triggered twin.
pub struct Watchdog {
    manager: Arc<LicenseManager>,
    handler: Arc<dyn TamperHandler>,
    entry_points: Arc<EntryPointRegistry>,
    expected_entry_points: Vec<String>,
    last_interaction_check: Mutex<Instant>,
}

impl Watchdog {
    /// Creates a watchdog over `manager`. The throttle clock starts at
    /// construction, so the first interaction-triggered check can only
    /// run [`INTERACTION_THROTTLE`] after startup.
    #[must_use]
    pub fn new(
        manager: Arc<LicenseManager>,
        handler: Arc<dyn TamperHandler>,
        entry_points: Arc<EntryPointRegistry>,
        expected_entry_points: &[&str],
    ) -> Arc<Self> {
        Arc::new(Self {
            manager,
            handler,
            entry_points,
            expected_entry_points: expected_entry_points
                .iter()
                .map(ToString::to_string)
                .collect(),
            last_interaction_check: Mutex::new(Instant::now()),
        })
    }

    /// Synchronous code-tamper heuristic: are all expected entry points
    /// still registered?
    #[must_use]
    pub fn check_code_integrity(&self) -> bool {
        let expected: Vec<&str> = self
            .expected_entry_points
            .iter()
            .map(String::as_str)
            .collect();
        self.entry_points.check(&expected)
    }

    /// Spawns the periodic task. Runs until a tamper verdict wipes the
    /// store, then exits.
    pub fn spawn_periodic(self: &Arc<Self>) -> JoinHandle<()> {
        let watchdog = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                Instant::now() + PERIODIC_INTERVAL,
                PERIODIC_INTERVAL,
            );
            loop {
                ticker.tick().await;
                if !watchdog.check_code_integrity() {
                    warn!("code integrity check failed");
                }
                match watchdog.manager.tamper_verdict() {
                    Verdict::Ok | Verdict::Unactivated => {}
                    Verdict::Tampered => {
                        watchdog.remediate().await;
                        return;
                    }
                }
            }
        })
    }

    /// Reports a user interaction. Re-verifies at most once per
    /// [`INTERACTION_THROTTLE`]; the throttle state is process-wide and
    /// survives in-session navigation.
    pub async fn notify_interaction(&self) {
        {
            let mut last = self
                .last_interaction_check
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            if now.duration_since(*last) < INTERACTION_THROTTLE {
                return;
            }
            *last = now;
        }

        debug!("interaction-triggered license check");
        if self.manager.tamper_verdict() == Verdict::Tampered {
            self.remediate().await;
        }
    }

    /// Irreversible remediation: notice, full wipe, delayed reload.
    async fn remediate(&self) {
        error!("license tampering detected, wiping local state");
        self.handler.notify(TAMPER_NOTICE);
        self.manager.wipe_all();
        tokio::time::sleep(RELOAD_DELAY).await;
        self.handler.reload();
    }
}
