// =============================================================================
// Market Data — price series types and the request-scoped cache
// =============================================================================

pub mod cache;

pub use cache::CandleCache;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Interval;

/// A single OHLC bar.
///
/// Invariant (enforced by the fetcher): all price fields are present and
/// finite, and a loaded series is ascending in `ts` with no duplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, unix seconds (UTC).
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    pub fn new(ts: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Extract the close column from a candle slice.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// Composite key identifying one fetched series: the exact argument tuple
/// of the fetch operation.  Identical requests hit the cache.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeriesKey {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}..{}@{}",
            self.ticker, self.start, self.end, self.interval
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closes_extracts_column() {
        let candles = vec![
            Candle::new(0, 1.0, 2.0, 0.5, 1.5, 10.0),
            Candle::new(60, 1.5, 2.5, 1.0, 2.0, 12.0),
        ];
        assert_eq!(closes(&candles), vec![1.5, 2.0]);
    }

    #[test]
    fn series_key_display() {
        let key = SeriesKey {
            ticker: "AAPL".into(),
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            interval: Interval::Daily,
        };
        assert_eq!(key.to_string(), "AAPL:2022-01-01..2023-01-01@1d");
    }
}
