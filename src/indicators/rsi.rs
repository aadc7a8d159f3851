// =============================================================================
// Relative Strength Index (RSI) — Wilder's Smoothing
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes to evaluate
// whether an asset is overbought or oversold.
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Seed average gain / average loss with the SMA of the first `period`
//          gains / losses.
// Step 3 — Apply Wilder's exponential smoothing:
//            avg_gain = (prev_avg_gain * (period - 1) + current_gain) / period
//            avg_loss = (prev_avg_loss * (period - 1) + current_loss) / period
// Step 4 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// A zero average loss maps to RSI = 100 (never a division by zero).
// Thresholds:  RSI > 70 => overbought,  RSI < 30 => oversold.
// =============================================================================

/// Default look-back period.
pub const DEFAULT_PERIOD: usize = 14;

/// Compute the RSI series for `closes`, aligned index-for-index with the
/// input.
///
/// One delta is consumed per close, so the first `period` positions are
/// `None`; every defined value lies in [0, 100].
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `closes.len() < period + 1` => all `None` (need `period` deltas)
/// - `avg_loss == 0` (gains only, or a dead-flat window) => exactly 100.0
/// - Non-finite intermediate values yield `None` from that position on.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = closes.len();
    if period == 0 || n < period + 1 {
        return vec![None; n];
    }

    // --- Compute price deltas ------------------------------------------------
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    // --- Seed averages with SMA of first `period` deltas ---------------------
    let (sum_gain, sum_loss) = deltas[..period]
        .iter()
        .fold((0.0_f64, 0.0_f64), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

    let period_f = period as f64;
    let mut avg_gain = sum_gain / period_f;
    let mut avg_loss = sum_loss / period_f;

    let mut out = vec![None; period];
    out.push(rsi_from_averages(avg_gain, avg_loss));

    // --- Wilder's smoothing for subsequent values ----------------------------
    let mut broken = false;
    for &delta in &deltas[period..] {
        if broken {
            out.push(None);
            continue;
        }

        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { delta.abs() } else { 0.0 };

        avg_gain = (avg_gain * (period_f - 1.0) + gain) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + loss) / period_f;

        let value = rsi_from_averages(avg_gain, avg_loss);
        if value.is_none() {
            // Non-finite — the rest of the series cannot be trusted.
            broken = true;
        }
        out.push(value);
    }

    out
}

// =============================================================================
// Internal helpers
// =============================================================================

/// Convert average gain / average loss into an RSI value in [0, 100].
///
/// - If average loss is zero (only gains, or no movement), RSI is 100.0.
/// - Returns `None` when the result is non-finite.
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        return None;
    }
    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    let value = 100.0 - 100.0 / (1.0 + rs);
    value.is_finite().then(|| value.clamp(0.0, 100.0))
}
