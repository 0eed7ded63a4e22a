//! Scoped task-watchdog budget management.
//!
//! The host platform runs a task watchdog: every task must check in
//! within a liveness budget or the device resets. An engine invocation
//! can legitimately exceed the default budget, so the worker extends the
//! budget for exactly the duration of the invocation and restores it
//! afterwards.
//!
//! Free-floating extend/restore call pairs around each long-running
//! region would leak the extended budget on any early return. The
//! extension is a guard value instead: the budget is restored on `Drop`,
//! so every exit path, including error paths, restores it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::debug;

/// Process-wide watchdog budget handle.
///
/// This is the seam to the host watchdog: [`Watchdog::budget`] is what
/// the platform integration reports as the current per-task deadline.
#[derive(Debug)]
pub struct Watchdog {
    default_budget: Duration,
    extended_budget: Duration,
    /// Current budget in milliseconds; written only by extend/restore.
    current_ms: AtomicU64,
}

impl Watchdog {
    /// Creates a watchdog handle with the given default and extended
    /// budgets.
    pub fn new(default_budget: Duration, extended_budget: Duration) -> Self {
        Self {
            default_budget,
            extended_budget,
            current_ms: AtomicU64::new(default_budget.as_millis() as u64),
        }
    }

    /// Extends the budget for a bounded-latency region.
    ///
    /// The returned guard restores the default budget when dropped.
    /// Guards do not nest: the engine mutex already guarantees at most
    /// one invocation, and therefore one extension, at a time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use infer_server::infrastructure::watchdog::Watchdog;
    ///
    /// let wd = Watchdog::new(Duration::from_secs(5), Duration::from_secs(20));
    /// {
    ///     let _guard = wd.extend();
    ///     assert_eq!(wd.budget(), Duration::from_secs(20));
    /// }
    /// assert_eq!(wd.budget(), Duration::from_secs(5));
    /// ```
    #[must_use = "the budget is restored when the guard is dropped"]
    pub fn extend(&self) -> WatchdogExtension<'_> {
        self.current_ms
            .store(self.extended_budget.as_millis() as u64, Ordering::Relaxed);
        debug!(budget_ms = self.extended_budget.as_millis() as u64, "watchdog budget extended");
        WatchdogExtension { watchdog: self }
    }

    /// The budget currently in force.
    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.current_ms.load(Ordering::Relaxed))
    }

    pub fn default_budget(&self) -> Duration {
        self.default_budget
    }

    fn restore(&self) {
        self.current_ms
            .store(self.default_budget.as_millis() as u64, Ordering::Relaxed);
        debug!(budget_ms = self.default_budget.as_millis() as u64, "watchdog budget restored");
    }
}

/// RAII guard for an extended watchdog budget.
#[derive(Debug)]
pub struct WatchdogExtension<'a> {
    watchdog: &'a Watchdog,
}

impl Drop for WatchdogExtension<'_> {
    fn drop(&mut self) {
        self.watchdog.restore();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
