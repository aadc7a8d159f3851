// =============================================================================
// Chart Builder — declarative chart specifications
// =============================================================================
//
// The builders turn candles + computed indicator series into a serializable
// `ChartSpec`.  The dashboard page, the HTML exporter, and the PNG rasterizer
// all consume the same structure; none of them recompute anything.
//
// Trace order in the price chart is fixed and independent of the order the
// toggles were flipped in: candlesticks first, then MA 20, MA 50, Boll Upper,
// Boll Lower — whichever of those are enabled.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::{bollinger, rsi, sma};
use crate::market_data::{closes, Candle};

/// Fast moving-average window (MA 20).
pub const MA_FAST_WINDOW: usize = 20;
/// Slow moving-average window (MA 50).
pub const MA_SLOW_WINDOW: usize = 50;
/// RSI reference line marking overbought territory.
pub const RSI_OVERBOUGHT: f64 = 70.0;
/// RSI reference line marking oversold territory.
pub const RSI_OVERSOLD: f64 = 30.0;

// ---------------------------------------------------------------------------
// Chart data model
// ---------------------------------------------------------------------------

/// One OHLC point of a candlestick trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// One point of a line trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    pub time: i64,
    pub value: f64,
}

/// A named trace.  Line traces carry only their defined points, so an
/// indicator's domain is a suffix of the candle domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trace {
    Candlestick {
        name: String,
        bars: Vec<CandlePoint>,
    },
    Line {
        name: String,
        points: Vec<LinePoint>,
    },
}

impl Trace {
    pub fn name(&self) -> &str {
        match self {
            Self::Candlestick { name, .. } => name,
            Self::Line { name, .. } => name,
        }
    }
}

/// A fixed horizontal reference line (used by the RSI chart at 30/70).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
    pub color: String,
}

/// An ordered collection of traces plus layout metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub traces: Vec<Trace>,
    #[serde(default)]
    pub reference_lines: Vec<ReferenceLine>,
}

impl ChartSpec {
    /// Trace names in render order.
    pub fn trace_names(&self) -> Vec<&str> {
        self.traces.iter().map(Trace::name).collect()
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Build the primary price chart: the candlestick trace plus whichever
/// overlays are toggled on, in fixed order.
///
/// An empty candle slice yields a spec with a zero-point candlestick trace.
pub fn build_price_chart(
    ticker: &str,
    candles: &[Candle],
    show_ma: bool,
    show_boll: bool,
) -> ChartSpec {
    let close_prices = closes(candles);

    let bars = candles
        .iter()
        .map(|c| CandlePoint {
            time: c.ts,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
        })
        .collect();

    let mut traces = vec![Trace::Candlestick {
        name: "Candlesticks".to_string(),
        bars,
    }];

    if show_ma {
        traces.push(line_trace(
            "MA 20",
            candles,
            &sma::moving_average(&close_prices, MA_FAST_WINDOW),
        ));
        traces.push(line_trace(
            "MA 50",
            candles,
            &sma::moving_average(&close_prices, MA_SLOW_WINDOW),
        ));
    }

    if show_boll {
        let bands = bollinger::bollinger_bands(&close_prices, bollinger::DEFAULT_WINDOW, bollinger::DEFAULT_K);
        traces.push(line_trace("Boll Upper", candles, &bands.upper));
        traces.push(line_trace("Boll Lower", candles, &bands.lower));
    }

    ChartSpec {
        title: format!("{} Price Chart", ticker.to_uppercase()),
        traces,
        reference_lines: Vec::new(),
    }
}

/// Build the secondary RSI chart with its fixed 30/70 reference lines.
///
/// The caller renders this only when the RSI toggle is active.
pub fn build_rsi_chart(candles: &[Candle]) -> ChartSpec {
    let close_prices = closes(candles);
    let series = rsi::rsi(&close_prices, rsi::DEFAULT_PERIOD);

    ChartSpec {
        title: "Relative Strength Index".to_string(),
        traces: vec![line_trace("RSI", candles, &series)],
        reference_lines: vec![
            ReferenceLine {
                value: RSI_OVERBOUGHT,
                label: "Overbought".to_string(),
                color: "red".to_string(),
            },
            ReferenceLine {
                value: RSI_OVERSOLD,
                label: "Oversold".to_string(),
                color: "green".to_string(),
            },
        ],
    }
}

/// Zip an aligned indicator series onto candle timestamps, keeping only the
/// defined points.
fn line_trace(name: &str, candles: &[Candle], series: &[Option<f64>]) -> Trace {
    let points = candles
        .iter()
        .zip(series)
        .filter_map(|(c, v)| v.map(|value| LinePoint { time: c.ts, value }))
        .collect();
    Trace::Line {
        name: name.to_string(),
        points,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.7).sin() * 5.0;
                Candle::new(
                    i as i64 * 86_400,
                    base,
                    base + 1.0,
                    base - 1.0,
                    base + 0.5,
                    1_000.0,
                )
            })
            .collect()
    }

    #[test]
    fn candlestick_is_always_first_and_only_mandatory_trace() {
        let candles = sample_candles(60);
        let spec = build_price_chart("aapl", &candles, false, false);
        assert_eq!(spec.trace_names(), vec!["Candlesticks"]);
        assert_eq!(spec.title, "AAPL Price Chart");
    }

    #[test]
    fn trace_order_is_fixed_with_all_toggles() {
        let candles = sample_candles(60);
        let spec = build_price_chart("AAPL", &candles, true, true);
        assert_eq!(
            spec.trace_names(),
            vec!["Candlesticks", "MA 20", "MA 50", "Boll Upper", "Boll Lower"]
        );
    }

    #[test]
    fn toggles_are_independent() {
        let candles = sample_candles(60);

        let ma_only = build_price_chart("AAPL", &candles, true, false);
        assert_eq!(ma_only.trace_names(), vec!["Candlesticks", "MA 20", "MA 50"]);

        let boll_only = build_price_chart("AAPL", &candles, false, true);
        assert_eq!(
            boll_only.trace_names(),
            vec!["Candlesticks", "Boll Upper", "Boll Lower"]
        );
    }

    #[test]
    fn empty_series_builds_empty_spec_without_raising() {
        let spec = build_price_chart("AAPL", &[], true, true);
        match &spec.traces[0] {
            Trace::Candlestick { bars, .. } => assert!(bars.is_empty()),
            other => panic!("first trace is not candlestick: {other:?}"),
        }
        // Overlay traces exist but carry zero points.
        for trace in &spec.traces[1..] {
            match trace {
                Trace::Line { points, .. } => assert!(points.is_empty()),
                other => panic!("unexpected trace {other:?}"),
            }
        }

        let rsi_spec = build_rsi_chart(&[]);
        match &rsi_spec.traces[0] {
            Trace::Line { points, .. } => assert!(points.is_empty()),
            other => panic!("unexpected trace {other:?}"),
        }
    }

    #[test]
    fn line_traces_skip_undefined_leading_positions() {
        let candles = sample_candles(60);
        let spec = build_price_chart("AAPL", &candles, true, false);
        match &spec.traces[1] {
            Trace::Line { points, .. } => {
                assert_eq!(points.len(), 60 - (MA_FAST_WINDOW - 1));
                // First defined point aligns with the window's last candle.
                assert_eq!(points[0].time, candles[MA_FAST_WINDOW - 1].ts);
            }
            other => panic!("unexpected trace {other:?}"),
        }
    }

    #[test]
    fn rsi_chart_carries_fixed_reference_lines() {
        let spec = build_rsi_chart(&sample_candles(60));
        assert_eq!(spec.reference_lines.len(), 2);
        assert!((spec.reference_lines[0].value - RSI_OVERBOUGHT).abs() < f64::EPSILON);
        assert!((spec.reference_lines[1].value - RSI_OVERSOLD).abs() < f64::EPSILON);
        assert_eq!(spec.title, "Relative Strength Index");
    }

    #[test]
    fn spec_serializes_with_tagged_traces() {
        let spec = build_price_chart("AAPL", &sample_candles(25), true, false);
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["traces"][0]["kind"], "candlestick");
        assert_eq!(json["traces"][1]["kind"], "line");
        assert_eq!(json["traces"][1]["name"], "MA 20");
    }
}
