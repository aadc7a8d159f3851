// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Bollinger Bands consist of a middle band (SMA), an upper band (SMA + k*σ),
// and a lower band (SMA - k*σ), where σ is the rolling population standard
// deviation over the same window.
// =============================================================================

use super::sma::moving_average;

/// Default look-back window for the bands.
pub const DEFAULT_WINDOW: usize = 20;
/// Default band width in standard deviations.
pub const DEFAULT_K: f64 = 2.0;

/// The three Bollinger series, each aligned with the input slice.
///
/// At every index either all three are defined or all three are `None`.
/// For k >= 0, `upper >= middle >= lower` wherever defined.
#[derive(Debug, Clone)]
pub struct BollingerSeries {
    pub middle: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

/// Calculate Bollinger Bands for `values` with the given `window` and band
/// width `k` (in standard deviations).
///
/// The first `window - 1` positions of every series are `None`; short input
/// yields all-`None` series of the input length rather than an error.
pub fn bollinger_bands(values: &[f64], window: usize, k: f64) -> BollingerSeries {
    let middle = moving_average(values, window);
    let mut upper = Vec::with_capacity(values.len());
    let mut lower = Vec::with_capacity(values.len());

    for (i, mid) in middle.iter().enumerate() {
        let Some(mid) = mid else {
            upper.push(None);
            lower.push(None);
            continue;
        };

        let slice = &values[i + 1 - window..=i];
        let variance = slice.iter().map(|x| (x - mid).powi(2)).sum::<f64>() / window as f64;
        let width = k * variance.sqrt();

        if width.is_finite() {
            upper.push(Some(mid + width));
            lower.push(Some(mid - width));
        } else {
            upper.push(None);
            lower.push(None);
        }
    }

    BollingerSeries {
        middle,
        upper,
        lower,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic_ordering() {
        let values: Vec<f64> = (1..=40).map(|x| x as f64).collect();
        let bb = bollinger_bands(&values, DEFAULT_WINDOW, DEFAULT_K);

        assert_eq!(bb.middle.len(), values.len());
        for i in 0..values.len() {
            match (bb.upper[i], bb.middle[i], bb.lower[i]) {
                (Some(u), Some(m), Some(l)) => {
                    assert!(u >= m, "upper {u} < middle {m} at {i}");
                    assert!(m >= l, "middle {m} < lower {l} at {i}");
                }
                (None, None, None) => assert!(i < DEFAULT_WINDOW - 1),
                other => panic!("bands disagree on definedness at {i}: {other:?}"),
            }
        }
    }

    #[test]
    fn bollinger_insufficient_data_is_all_none() {
        let bb = bollinger_bands(&[1.0, 2.0, 3.0], 20, 2.0);
        assert_eq!(bb.middle.len(), 3);
        assert!(bb.middle.iter().all(Option::is_none));
        assert!(bb.upper.iter().all(Option::is_none));
        assert!(bb.lower.iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat_series_has_zero_width() {
        let values = vec![100.0; 25];
        let bb = bollinger_bands(&values, 20, 2.0);
        let i = values.len() - 1;
        let (u, m, l) = (
            bb.upper[i].unwrap(),
            bb.middle[i].unwrap(),
            bb.lower[i].unwrap(),
        );
        assert!((u - m).abs() < 1e-12);
        assert!((m - l).abs() < 1e-12);
        assert!((m - 100.0).abs() < 1e-12);
    }

    #[test]
    fn bollinger_zero_k_collapses_to_middle() {
        let values: Vec<f64> = (1..=30).map(|x| (x as f64).sin() + 10.0).collect();
        let bb = bollinger_bands(&values, 10, 0.0);
        for i in 9..values.len() {
            assert!((bb.upper[i].unwrap() - bb.middle[i].unwrap()).abs() < 1e-12);
            assert!((bb.lower[i].unwrap() - bb.middle[i].unwrap()).abs() < 1e-12);
        }
    }

    #[test]
    fn bollinger_known_window() {
        // Window of [2, 4, 6]: mean 4, population variance 8/3.
        let values = vec![2.0, 4.0, 6.0];
        let bb = bollinger_bands(&values, 3, 2.0);
        let sigma = (8.0_f64 / 3.0).sqrt();
        assert!((bb.middle[2].unwrap() - 4.0).abs() < 1e-12);
        assert!((bb.upper[2].unwrap() - (4.0 + 2.0 * sigma)).abs() < 1e-12);
        assert!((bb.lower[2].unwrap() - (4.0 - 2.0 * sigma)).abs() < 1e-12);
    }
}
