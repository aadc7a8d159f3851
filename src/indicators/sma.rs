// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// SMA_i = mean(values[i - w + 1 ..= i]) for a look-back window of w values.
// =============================================================================

/// Compute the simple moving average series for `values` with the given
/// look-back `window`.
///
/// The output has exactly the same length as the input.  Index `i` holds the
/// arithmetic mean of the trailing `window` values ending at `i`; the first
/// `window - 1` positions are `None` (insufficient history).
///
/// # Edge cases
/// - `window == 0` => all `None` (degenerate window)
/// - `values.len() < window` => all `None`
/// - Non-finite means are reported as `None` for that position.
pub fn moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i + 1 < window {
            out.push(None);
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        out.push(mean.is_finite().then_some(mean));
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(moving_average(&[], 20).is_empty());
    }

    #[test]
    fn sma_window_zero() {
        assert_eq!(moving_average(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_short_series_is_all_none() {
        let out = moving_average(&[1.0, 2.0, 3.0], 20);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(Option::is_none));
    }

    #[test]
    fn sma_leading_positions_undefined() {
        let values: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = moving_average(&values, 4);
        assert_eq!(out.len(), values.len());
        assert!(out[..3].iter().all(Option::is_none));
        assert!(out[3..].iter().all(Option::is_some));
    }

    #[test]
    fn sma_matches_arithmetic_mean() {
        let values = vec![2.0, 4.0, 6.0, 8.0, 10.0];
        let out = moving_average(&values, 3);
        // mean(2, 4, 6) = 4, mean(4, 6, 8) = 6, mean(6, 8, 10) = 8
        assert!((out[2].unwrap() - 4.0).abs() < 1e-12);
        assert!((out[3].unwrap() - 6.0).abs() < 1e-12);
        assert!((out[4].unwrap() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn sma_window_one_is_identity() {
        let values = vec![3.5, 1.25, -2.0];
        let out = moving_average(&values, 1);
        for (v, o) in values.iter().zip(&out) {
            assert!((o.unwrap() - v).abs() < 1e-12);
        }
    }
}
