// =============================================================================
// Request Budget — self-imposed cap on provider requests
// =============================================================================
//
// The chart endpoint is public and publishes no usage headers, so the only
// protection against tripping the provider's throttling is a local budget:
// a fixed one-minute window with atomic counters that any request handler
// may consult lock-free.  Cache hits never touch the budget.
// =============================================================================

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hard ceiling at which we refuse to send additional requests.
const BUDGET_PER_MINUTE: u32 = 60;
/// Soft warning threshold.
const WARN_THRESHOLD: u32 = 45;

/// Thread-safe per-minute request budget backed by atomic counters.
pub struct RequestBudget {
    /// Unix minute the current window belongs to.
    window_minute: AtomicU64,
    /// Requests sent within the current window.
    used: AtomicU32,
}

/// Immutable snapshot of the current budget state (suitable for
/// serialization into a dashboard payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub used: u32,
    pub limit: u32,
    pub window_minute: u64,
}

impl RequestBudget {
    /// Create a budget with an empty current window.
    pub fn new() -> Self {
        Self {
            window_minute: AtomicU64::new(Self::current_minute()),
            used: AtomicU32::new(0),
        }
    }

    /// Try to reserve one request slot in the current window.
    ///
    /// Returns `false` when the per-minute budget is exhausted; the caller
    /// must surface that as a recoverable error, not retry in a loop.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Self::current_minute())
    }

    /// Window-explicit variant of [`try_acquire`](Self::try_acquire).
    pub fn try_acquire_at(&self, minute: u64) -> bool {
        let window = self.window_minute.load(Ordering::Relaxed);
        if window != minute {
            // New window — roll over and reset the counter.
            self.window_minute.store(minute, Ordering::Relaxed);
            self.used.store(0, Ordering::Relaxed);
            debug!(minute, "request budget window rolled");
        }

        let used = self.used.fetch_add(1, Ordering::Relaxed) + 1;
        if used > BUDGET_PER_MINUTE {
            warn!(
                used,
                limit = BUDGET_PER_MINUTE,
                "provider request blocked — per-minute budget exhausted"
            );
            return false;
        }
        if used == WARN_THRESHOLD {
            warn!(
                used,
                limit = BUDGET_PER_MINUTE,
                "provider request budget crossed warning threshold"
            );
        }
        true
    }

    /// Current unix minute.
    fn current_minute() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_secs()
            / 60
    }

    /// Produce a serializable snapshot of the current window.
    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            used: self.used.load(Ordering::Relaxed).min(BUDGET_PER_MINUTE),
            limit: BUDGET_PER_MINUTE,
            window_minute: self.window_minute.load(Ordering::Relaxed),
        }
    }
}

impl Default for RequestBudget {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RequestBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBudget")
            .field("used", &self.used.load(Ordering::Relaxed))
            .field("limit", &BUDGET_PER_MINUTE)
            .finish()
    }
}
