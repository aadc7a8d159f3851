// =============================================================================
// Interactive HTML export
// =============================================================================
//
// Produces a standalone document: the chart payload is inlined as JSON and
// rendered client-side with Lightweight Charts.  The file opens anywhere, no
// connection back to this process.

use crate::chart::ChartSpec;

use super::ExportError;

/// Render the price chart (and the RSI chart when present) into a single
/// self-contained HTML document.
pub fn render_html(price: &ChartSpec, rsi: Option<&ChartSpec>) -> Result<String, ExportError> {
    let price_json =
        serde_json::to_string(price).map_err(|e| ExportError::Encode(e.to_string()))?;
    let rsi_json = match rsi {
        Some(spec) => serde_json::to_string(spec).map_err(|e| ExportError::Encode(e.to_string()))?,
        None => "null".to_string(),
    };

    let rsi_container = if rsi.is_some() {
        r#"<h2 id="rsi-title"></h2><div id="rsi-chart" class="chart"></div>"#
    } else {
        ""
    };

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<script src="https://unpkg.com/lightweight-charts@4.1.0/dist/lightweight-charts.standalone.production.js"></script>
<style>
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
         background: #131722; color: #d1d4dc; margin: 0; padding: 24px; }}
  h1, h2 {{ font-weight: 600; }}
  h1 {{ font-size: 20px; }}
  h2 {{ font-size: 15px; color: #787b86; }}
  .chart {{ width: 100%; }}
  #price-chart {{ height: 480px; }}
  #rsi-chart {{ height: 200px; }}
</style>
</head>
<body>
<h1 id="price-title"></h1>
<div id="price-chart" class="chart"></div>
{rsi_container}
<script>
const PRICE_SPEC = {price_json};
const RSI_SPEC = {rsi_json};
const LINE_COLORS = ["#2196f3", "#ff9800", "#9c27b0", "#607d8b"];

function renderSpec(spec, containerId, titleId) {{
  document.getElementById(titleId).textContent = spec.title;
  const chart = LightweightCharts.createChart(document.getElementById(containerId), {{
    layout: {{ background: {{ color: "#131722" }}, textColor: "#d1d4dc" }},
    grid: {{ vertLines: {{ color: "#1e222d" }}, horzLines: {{ color: "#1e222d" }} }},
    timeScale: {{ timeVisible: true }},
  }});
  let lineIndex = 0;
  let firstSeries = null;
  for (const trace of spec.traces) {{
    if (trace.kind === "candlestick") {{
      const series = chart.addCandlestickSeries({{
        upColor: "#00c853", downColor: "#ff5252",
        wickUpColor: "#00c853", wickDownColor: "#ff5252", borderVisible: false,
      }});
      series.setData(trace.bars);
      if (!firstSeries) firstSeries = series;
    }} else {{
      const series = chart.addLineSeries({{
        color: LINE_COLORS[lineIndex++ % LINE_COLORS.length],
        lineWidth: 1, title: trace.name,
      }});
      series.setData(trace.points);
      if (!firstSeries) firstSeries = series;
    }}
  }}
  for (const ref of spec.reference_lines) {{
    if (firstSeries) firstSeries.createPriceLine({{
      price: ref.value, color: ref.color, lineStyle: LightweightCharts.LineStyle.Dashed,
      title: ref.label,
    }});
  }}
  chart.timeScale().fitContent();
}}

renderSpec(PRICE_SPEC, "price-chart", "price-title");
if (RSI_SPEC) renderSpec(RSI_SPEC, "rsi-chart", "rsi-title");
</script>
</body>
</html>
"##,
        title = price.title,
    ))
}
