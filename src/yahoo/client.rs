// =============================================================================
// Yahoo Finance REST Client — public v8 chart endpoint
// =============================================================================
//
// The chart endpoint needs no authentication, but it rejects requests with
// no User-Agent and silently throttles aggressive callers, so the client
// always sends a UA header and carries an explicit request timeout.
//
// Error contract: an unknown ticker or an interval/range combination the
// provider does not serve is an EMPTY series, not an error.  Only transport
// failures, timeouts, and provider 5xx responses are fetch errors.
// =============================================================================

use chrono::{NaiveDate, NaiveTime};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::market_data::Candle;
use crate::types::Interval;

/// Explicit timeout on every provider request.  The original design blocked
/// without bound; a stuck fetch must become a visible, distinguishable error.
const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Default provider base URL.
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Failures the fetch pipeline can produce, by recovery class.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider did not answer within [`FETCH_TIMEOUT`].
    #[error("provider request timed out")]
    Timeout,

    /// Connection-level failure (DNS, TLS, refused, reset).
    #[error("provider request failed: {0}")]
    Transport(String),

    /// The provider answered with a server-side error.
    #[error("provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// The response body was not the JSON shape we expect.
    #[error("failed to decode provider response: {0}")]
    Decode(String),

    /// The local per-minute request budget is exhausted.
    #[error("provider request budget exhausted — retry in a minute")]
    BudgetExhausted,
}

impl FetchError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// HTTP client for the provider's chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `YahooClient` against `base_url` (usually
    /// [`DEFAULT_BASE_URL`]; overridable for tests and proxies).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static("stockviz/1.0"));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("failed to build reqwest client");

        let base_url = base_url.into();
        debug!(base_url = %base_url, "YahooClient initialised");

        Self { base_url, client }
    }

    // -------------------------------------------------------------------------
    // Chart data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{ticker} — fetch OHLC bars for the inclusive
    /// date range at the given interval.
    ///
    /// Bars with any missing price field are dropped, and the returned
    /// series is strictly ascending in timestamp with no duplicates.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: Interval,
    ) -> Result<Vec<Candle>, FetchError> {
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // End date is inclusive: query up to the following midnight.
        let period2 = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval={}&includePrePost=false&events=history",
            self.base_url,
            ticker,
            period1,
            period2,
            interval.as_provider_str()
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = resp.status();

        // 4xx means "the provider has nothing for these arguments" — an
        // unknown ticker, or intraday granularity beyond its history limit.
        // That is valid-but-empty data, not a failure.
        if status.is_client_error() {
            let message = resp
                .json::<Value>()
                .await
                .ok()
                .as_ref()
                .map(extract_error_message)
                .unwrap_or_default();
            warn!(ticker, %status, message = %message, "provider has no data for request — empty series");
            return Ok(Vec::new());
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message: extract_error_message(&body),
            });
        }

        let candles = parse_chart_body(&body)?;
        debug!(ticker, interval = %interval, count = candles.len(), "chart fetched");
        Ok(candles)
    }
}

// =============================================================================
// Response parsing
// =============================================================================

/// Parse the provider's chart payload into candles.
///
/// The shape is `chart.result[0].timestamp[]` alongside parallel arrays under
/// `chart.result[0].indicators.quote[0].{open,high,low,close,volume}`.
/// Rows where any OHLC entry is null are dropped; non-ascending timestamps
/// are skipped defensively.
fn parse_chart_body(body: &Value) -> Result<Vec<Candle>, FetchError> {
    let chart = body
        .get("chart")
        .ok_or_else(|| FetchError::Decode("response missing 'chart' object".into()))?;

    // A populated error with no result is the provider's "no data" answer.
    let result = match chart.get("result").and_then(Value::as_array) {
        Some(arr) if !arr.is_empty() => &arr[0],
        _ => {
            if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
                warn!(provider_error = %err, "provider reported no result");
            }
            return Ok(Vec::new());
        }
    };

    let Some(timestamps) = result.get("timestamp").and_then(Value::as_array) else {
        // Valid result with no bars (e.g. range entirely outside trading days).
        return Ok(Vec::new());
    };

    let quote = result
        .pointer("/indicators/quote/0")
        .ok_or_else(|| FetchError::Decode("response missing indicators.quote[0]".into()))?;

    let column = |name: &str| quote.get(name).and_then(Value::as_array);
    let (Some(opens), Some(highs), Some(lows), Some(closes)) = (
        column("open"),
        column("high"),
        column("low"),
        column("close"),
    ) else {
        return Err(FetchError::Decode(
            "quote object missing one of open/high/low/close".into(),
        ));
    };
    let volumes = column("volume");

    let mut candles = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(ts) = ts.as_i64() else { continue };

        // Drop the whole row when any price field is missing.
        let ohlc = (
            opens.get(i).and_then(Value::as_f64),
            highs.get(i).and_then(Value::as_f64),
            lows.get(i).and_then(Value::as_f64),
            closes.get(i).and_then(Value::as_f64),
        );
        let (Some(open), Some(high), Some(low), Some(close)) = ohlc else {
            continue;
        };

        // Provider data is ascending; skip anything that is not.
        if candles.last().is_some_and(|last: &Candle| ts <= last.ts) {
            continue;
        }

        let volume = volumes
            .and_then(|v| v.get(i))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        candles.push(Candle::new(ts, open, high, low, close, volume));
    }

    Ok(candles)
}

/// Pull a human-readable message out of the provider's error envelope.
fn extract_error_message(body: &Value) -> String {
    body.pointer("/chart/error/description")
        .and_then(Value::as_str)
        .unwrap_or("no error description")
        .to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chart_body(timestamps: Value, quote: Value) -> Value {
        json!({
            "chart": {
                "result": [{
                    "timestamp": timestamps,
                    "indicators": { "quote": [quote] }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn parses_well_formed_body() {
        let body = chart_body(
            json!([100, 200, 300]),
            json!({
                "open":   [1.0, 2.0, 3.0],
                "high":   [1.5, 2.5, 3.5],
                "low":    [0.5, 1.5, 2.5],
                "close":  [1.2, 2.2, 3.2],
                "volume": [10.0, 20.0, 30.0]
            }),
        );
        let candles = parse_chart_body(&body).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[1].ts, 200);
        assert!((candles[2].close - 3.2).abs() < 1e-12);
    }

    #[test]
    fn drops_rows_with_null_fields() {
        let body = chart_body(
            json!([100, 200, 300]),
            json!({
                "open":   [1.0, null, 3.0],
                "high":   [1.5, 2.5, 3.5],
                "low":    [0.5, 1.5, 2.5],
                "close":  [1.2, 2.2, null],
                "volume": [10.0, 20.0, 30.0]
            }),
        );
        let candles = parse_chart_body(&body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].ts, 100);
    }

    #[test]
    fn skips_non_ascending_timestamps() {
        let body = chart_body(
            json!([100, 100, 90, 200]),
            json!({
                "open":   [1.0, 1.0, 1.0, 2.0],
                "high":   [1.5, 1.5, 1.5, 2.5],
                "low":    [0.5, 0.5, 0.5, 1.5],
                "close":  [1.2, 1.2, 1.2, 2.2],
                "volume": [10.0, 10.0, 10.0, 20.0]
            }),
        );
        let candles = parse_chart_body(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert!(candles[0].ts < candles[1].ts);
    }

    #[test]
    fn provider_error_with_no_result_is_empty() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found" }
            }
        });
        assert!(parse_chart_body(&body).unwrap().is_empty());
    }

    #[test]
    fn result_without_timestamps_is_empty() {
        let body = json!({
            "chart": { "result": [{ "meta": {} }], "error": null }
        });
        assert!(parse_chart_body(&body).unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let body = json!({ "nothing": true });
        assert!(matches!(
            parse_chart_body(&body),
            Err(FetchError::Decode(_))
        ));

        let missing_quote = json!({
            "chart": { "result": [{ "timestamp": [1, 2] }], "error": null }
        });
        assert!(matches!(
            parse_chart_body(&missing_quote),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn error_message_extraction() {
        let body = json!({
            "chart": { "error": { "description": "boom" } }
        });
        assert_eq!(extract_error_message(&body), "boom");
        assert_eq!(extract_error_message(&json!({})), "no error description");
    }
}
