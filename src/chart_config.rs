// =============================================================================
// Chart Configuration — the seven user-facing dashboard settings
// =============================================================================
//
// The flat settings document behind the dashboard controls: ticker, date
// range, sampling interval, and the three indicator toggles.  The same
// structure round-trips through `config.json` downloads/uploads and is
// persisted across restarts.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::Interval;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_ticker() -> String {
    "AAPL".to_string()
}

fn default_start_date() -> String {
    "2022-01-01".to_string()
}

fn default_end_date() -> String {
    chrono::Utc::now().date_naive().to_string()
}

// =============================================================================
// ChartConfig
// =============================================================================

/// The dashboard's user selections as a flat key/value document.
///
/// Keys match the downloadable `config.json` format exactly: `ticker`,
/// `start_date`, `end_date`, `interval`, `show_ma`, `show_rsi`, `show_boll`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Ticker symbol to chart (e.g. "AAPL").
    #[serde(default = "default_ticker")]
    pub ticker: String,

    /// Inclusive start of the date range, ISO format (YYYY-MM-DD).
    #[serde(default = "default_start_date")]
    pub start_date: String,

    /// Inclusive end of the date range, ISO format (YYYY-MM-DD).
    #[serde(default = "default_end_date")]
    pub end_date: String,

    /// Bar sampling interval.
    #[serde(default)]
    pub interval: Interval,

    /// Overlay MA20 + MA50 on the price chart.
    #[serde(default)]
    pub show_ma: bool,

    /// Render the secondary RSI chart.
    #[serde(default)]
    pub show_rsi: bool,

    /// Overlay Bollinger Bands on the price chart.
    #[serde(default)]
    pub show_boll: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            start_date: default_start_date(),
            end_date: default_end_date(),
            interval: Interval::Daily,
            show_ma: false,
            show_rsi: false,
            show_boll: false,
        }
    }
}

impl ChartConfig {
    /// Ticker normalized the way the dashboard displays it.
    pub fn normalized_ticker(&self) -> String {
        self.ticker.trim().to_uppercase()
    }

    /// Parse and validate the configured date range.
    ///
    /// Errors when either date is not ISO formatted or start > end.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::parse_from_str(&self.start_date, "%Y-%m-%d")
            .with_context(|| format!("invalid start_date '{}'", self.start_date))?;
        let end = NaiveDate::parse_from_str(&self.end_date, "%Y-%m-%d")
            .with_context(|| format!("invalid end_date '{}'", self.end_date))?;
        if start > end {
            anyhow::bail!("start_date {start} is after end_date {end}");
        }
        Ok((start, end))
    }

    /// Validate the whole document: non-empty ticker and a sane date range.
    pub fn validate(&self) -> Result<()> {
        if self.normalized_ticker().is_empty() {
            anyhow::bail!("ticker must not be empty");
        }
        self.date_range()?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Textual (download/upload) form
    // -------------------------------------------------------------------------

    /// Serialize to the downloadable `config.json` text.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize config to JSON")
    }

    /// Parse an uploaded configuration document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse configuration document")
    }

    // -------------------------------------------------------------------------
    // Disk persistence
    // -------------------------------------------------------------------------

    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;

        let config = Self::from_json_str(&content)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;

        info!(
            path = %path.display(),
            ticker = %config.ticker,
            interval = %config.interval,
            "chart config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    ///
    /// This prevents corruption if the process crashes mid-write.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = self.to_json_string()?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "chart config saved (atomic)");
        Ok(())
    }
}
