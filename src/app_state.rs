// =============================================================================
// Central Application State — StockViz dashboard
// =============================================================================
//
// The single source of truth for the service.  Request handlers hold an
// `Arc<AppState>` and go through it for configuration, cached price data,
// and the provider client.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for all mutable shared values.
//   - The candle cache and request budget manage their own interior
//     mutability.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::chart_config::ChartConfig;
use crate::market_data::{Candle, CandleCache, SeriesKey};
use crate::portfolio::PortfolioTable;
use crate::yahoo::{FetchError, RequestBudget, YahooClient};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of cached price series.
const CANDLE_CACHE_CAPACITY: usize = 64;

/// Central application state shared across request handlers via
/// `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter, incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub chart_config: RwLock<ChartConfig>,
    /// Where the config is persisted on mutation and shutdown.
    pub config_path: PathBuf,

    // ── Market Data ─────────────────────────────────────────────────────
    pub provider: YahooClient,
    pub candle_cache: CandleCache,
    pub request_budget: RequestBudget,

    // ── Uploads ─────────────────────────────────────────────────────────
    /// The most recently uploaded portfolio, if any.
    pub portfolio: RwLock<Option<PortfolioTable>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState`. The returned value is typically wrapped
    /// in `Arc` immediately.
    pub fn new(config: ChartConfig, provider: YahooClient, config_path: PathBuf) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            chart_config: RwLock::new(config),
            config_path,
            provider,
            candle_cache: CandleCache::new(CANDLE_CACHE_CAPACITY),
            request_budget: RequestBudget::new(),
            portfolio: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call after every meaningful
    /// mutation.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error message. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted when the limit is
    /// reached.
    pub fn push_error(&self, message: String) {
        let mut errors = self.recent_errors.write();
        errors.push(ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        });
        let overflow = errors.len().saturating_sub(MAX_RECENT_ERRORS);
        if overflow > 0 {
            errors.drain(..overflow);
        }
    }

    // ── Data Fetching ───────────────────────────────────────────────────

    /// Load the price series for `key`: cache first, then the provider.
    ///
    /// Fresh results (including valid-but-empty ones) are inserted into the
    /// cache so a repeated identical request never refetches.  Cache hits do
    /// not consume request budget.
    pub async fn load_candles(&self, key: &SeriesKey) -> Result<Vec<Candle>, FetchError> {
        if let Some(hit) = self.candle_cache.get(key) {
            return Ok(hit);
        }

        if !self.request_budget.try_acquire() {
            return Err(FetchError::BudgetExhausted);
        }

        let candles = self
            .provider
            .get_chart(&key.ticker, key.start, key.end, key.interval)
            .await?;

        debug!(key = %key, count = candles.len(), "series fetched and cached");
        self.candle_cache.insert(key.clone(), candles.clone());
        Ok(candles)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::yahoo::client::DEFAULT_BASE_URL;

    fn state() -> AppState {
        AppState::new(
            ChartConfig::default(),
            YahooClient::new(DEFAULT_BASE_URL),
            PathBuf::from("chart_config.json"),
        )
    }

    #[test]
    fn version_increments() {
        let state = state();
        let v0 = state.current_state_version();
        state.increment_version();
        assert_eq!(state.current_state_version(), v0 + 1);
    }

    #[test]
    fn error_ring_is_bounded() {
        let state = state();
        for i in 0..(MAX_RECENT_ERRORS + 10) {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        // Oldest entries were evicted.
        assert_eq!(errors[0].message, "error 10");
    }
}
