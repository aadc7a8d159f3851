// =============================================================================
// PNG export — pure-Rust rasterization of a chart specification
// =============================================================================
//
// Draws into an in-memory RGB buffer with plotters, then encodes to PNG.
// The x axis is the bar index (uniform spacing, like the interactive view
// with its range slider hidden); the y range is derived from every visible
// trace so all overlays are inside the frame.

use std::collections::HashMap;

use plotters::prelude::*;

use crate::chart::{ChartSpec, Trace};

use super::ExportError;

pub const PNG_WIDTH: u32 = 1280;
pub const PNG_HEIGHT: u32 = 720;

const UP_COLOR: RGBColor = RGBColor(0, 200, 83);
const DOWN_COLOR: RGBColor = RGBColor(255, 82, 82);
const REF_COLOR: RGBColor = RGBColor(120, 123, 134);
const LINE_COLORS: [RGBColor; 4] = [
    RGBColor(33, 150, 243),
    RGBColor(255, 152, 0),
    RGBColor(156, 39, 176),
    RGBColor(96, 125, 139),
];

/// Rasterize `spec` to PNG bytes.
///
/// An empty spec produces a blank (but valid) image; drawing or encoding
/// failures surface as [`ExportError`], never a panic.
pub fn render_png(spec: &ChartSpec) -> Result<Vec<u8>, ExportError> {
    let mut buf = vec![0u8; (PNG_WIDTH * PNG_HEIGHT * 3) as usize];
    draw_into(spec, &mut buf)?;
    encode_png(buf)
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn draw_into(spec: &ChartSpec, buf: &mut [u8]) -> Result<(), ExportError> {
    let root = BitMapBackend::with_buffer(buf, (PNG_WIDTH, PNG_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let x_index = time_index(spec);
    let n = x_index.len();

    let Some((y_min, y_max)) = value_range(spec) else {
        // Nothing to draw — a blank canvas is still a valid export.
        root.present().map_err(render_err)?;
        return Ok(());
    };

    let pad = ((y_max - y_min) * 0.05).max(1e-9);
    let mut chart = ChartBuilder::on(&root)
        .margin(16)
        .build_cartesian_2d(-1..n as i32, (y_min - pad)..(y_max + pad))
        .map_err(render_err)?;

    let bar_px = (PNG_WIDTH / (n as u32 + 1)).saturating_sub(2).clamp(1, 10);

    let mut line_idx = 0usize;
    for trace in &spec.traces {
        match trace {
            Trace::Candlestick { bars, .. } => {
                chart
                    .draw_series(bars.iter().filter_map(|b| {
                        let x = *x_index.get(&b.time)?;
                        Some(CandleStick::new(
                            x,
                            b.open,
                            b.high,
                            b.low,
                            b.close,
                            UP_COLOR.filled(),
                            DOWN_COLOR.filled(),
                            bar_px,
                        ))
                    }))
                    .map_err(render_err)?;
            }
            Trace::Line { points, .. } => {
                let color = LINE_COLORS[line_idx % LINE_COLORS.len()];
                line_idx += 1;
                chart
                    .draw_series(LineSeries::new(
                        points
                            .iter()
                            .filter_map(|p| x_index.get(&p.time).map(|&x| (x, p.value))),
                        ShapeStyle::from(&color).stroke_width(2),
                    ))
                    .map_err(render_err)?;
            }
        }
    }

    for ref_line in &spec.reference_lines {
        chart
            .draw_series(LineSeries::new(
                [(-1, ref_line.value), (n as i32, ref_line.value)],
                ShapeStyle::from(&REF_COLOR).stroke_width(1),
            ))
            .map_err(render_err)?;
    }

    root.present().map_err(render_err)?;
    Ok(())
}

/// Map every timestamp appearing in the spec to its x index.
fn time_index(spec: &ChartSpec) -> HashMap<i64, i32> {
    let mut times: Vec<i64> = Vec::new();
    for trace in &spec.traces {
        match trace {
            Trace::Candlestick { bars, .. } => times.extend(bars.iter().map(|b| b.time)),
            Trace::Line { points, .. } => times.extend(points.iter().map(|p| p.time)),
        }
    }
    times.sort_unstable();
    times.dedup();
    times
        .into_iter()
        .enumerate()
        .map(|(i, t)| (t, i as i32))
        .collect()
}

/// The min/max over every value the chart will show, including reference
/// lines.  `None` when the spec has no points at all.
fn value_range(spec: &ChartSpec) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;

    for trace in &spec.traces {
        match trace {
            Trace::Candlestick { bars, .. } => {
                for b in bars {
                    min = min.min(b.low);
                    max = max.max(b.high);
                    any = true;
                }
            }
            Trace::Line { points, .. } => {
                for p in points {
                    min = min.min(p.value);
                    max = max.max(p.value);
                    any = true;
                }
            }
        }
    }
    if any {
        for ref_line in &spec.reference_lines {
            min = min.min(ref_line.value);
            max = max.max(ref_line.value);
        }
    }

    (any && min.is_finite() && max.is_finite()).then_some((min, max))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn encode_png(buf: Vec<u8>) -> Result<Vec<u8>, ExportError> {
    let img = image::RgbImage::from_raw(PNG_WIDTH, PNG_HEIGHT, buf)
        .ok_or_else(|| ExportError::Encode("pixel buffer size mismatch".to_string()))?;
    let mut out = Vec::new();
    img.write_to(
        &mut std::io::Cursor::new(&mut out),
        image::ImageFormat::Png,
    )
    .map_err(|e| ExportError::Encode(e.to_string()))?;
    Ok(out)
}

fn render_err<E: std::fmt::Display>(e: E) -> ExportError {
    ExportError::Render(e.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{build_price_chart, build_rsi_chart};
    use crate::market_data::Candle;

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn sample_candles(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.3).sin() * 4.0;
                Candle::new(
                    i as i64 * 86_400,
                    base,
                    base + 2.0,
                    base - 2.0,
                    base + 1.0,
                    500.0,
                )
            })
            .collect()
    }

    #[test]
    fn renders_full_chart_with_overlays() {
        let candles = sample_candles(80);
        let spec = build_price_chart("AAPL", &candles, true, true);
        let bytes = render_png(&spec).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        assert!(bytes.len() > PNG_SIGNATURE.len());
    }

    #[test]
    fn renders_rsi_chart_with_reference_lines() {
        let spec = build_rsi_chart(&sample_candles(60));
        let bytes = render_png(&spec).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn empty_spec_yields_blank_but_valid_png() {
        let spec = build_price_chart("AAPL", &[], true, true);
        let bytes = render_png(&spec).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn value_range_covers_reference_lines() {
        let spec = build_rsi_chart(&sample_candles(60));
        let (min, max) = value_range(&spec).unwrap();
        assert!(min <= 30.0);
        assert!(max >= 70.0);
    }

    #[test]
    fn value_range_of_empty_spec_is_none() {
        let spec = build_price_chart("AAPL", &[], false, false);
        assert!(value_range(&spec).is_none());
    }
}
