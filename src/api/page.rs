// =============================================================================
// Dashboard Page — embedded single-page UI
// =============================================================================
//
// The whole interface ships inline: controls on top, the price chart and the
// optional RSI panel below, rendered client-side with Lightweight Charts from
// the chart specs returned by `/api/v1/chart`.

use axum::response::Html;

/// Serve the dashboard page.
pub async fn index_page() -> Html<&'static str> {
    Html(PAGE)
}

const PAGE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>StockViz — Stock Market Visualizer</title>
<script src="https://unpkg.com/lightweight-charts@4.1.0/dist/lightweight-charts.standalone.production.js"></script>
<style>
  * { margin: 0; padding: 0; box-sizing: border-box; }
  body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    background: #131722; color: #d1d4dc; min-height: 100vh; padding-bottom: 24px;
  }
  .header {
    padding: 12px 24px; background: #1e222d; border-bottom: 1px solid #2a2e39;
    display: flex; align-items: center; gap: 16px; flex-wrap: wrap;
  }
  .header h1 { font-size: 18px; color: #00c853; font-weight: 600; }
  .controls { display: flex; gap: 12px; align-items: center; flex-wrap: wrap; }
  select, button, input {
    background: #2a2e39; border: 1px solid #363c4e; color: #d1d4dc;
    padding: 8px 12px; border-radius: 4px; font-size: 14px;
  }
  input[type="text"] { width: 90px; text-transform: uppercase; }
  select:hover, button:hover { border-color: #00c853; cursor: pointer; }
  button { background: #00c853; color: #131722; font-weight: 600; }
  button:hover { background: #00e676; }
  .toggle-group {
    display: flex; align-items: center; gap: 6px; padding: 4px 8px;
    background: #252930; border-radius: 4px; font-size: 12px;
  }
  .toggle-group label { color: #787b86; cursor: pointer; }
  .section {
    margin: 16px 24px; padding: 12px 16px; background: #1e222d;
    border: 1px solid #2a2e39; border-radius: 8px;
  }
  .section h2 { font-size: 14px; color: #787b86; margin-bottom: 8px; }
  #chart-title { margin: 16px 24px 0; font-size: 16px; font-weight: 600; }
  #price-chart { height: 440px; margin: 8px 24px 0; }
  #rsi-block { display: none; }
  #rsi-chart { height: 160px; margin: 8px 24px 0; }
  #rsi-title { margin: 16px 24px 0; font-size: 13px; color: #787b86; }
  #message {
    display: none; margin: 12px 24px; padding: 10px 14px; border-radius: 4px;
    font-size: 13px; background: #2d1a1e; border: 1px solid #ff5252; color: #ff8a80;
  }
  #message.info { background: #14241a; border-color: #00c853; color: #69f0ae; }
  table { border-collapse: collapse; font-size: 12px; width: 100%; }
  th, td { border: 1px solid #2a2e39; padding: 4px 8px; text-align: left; }
  th { color: #787b86; }
</style>
</head>
<body>
<div class="header">
  <h1>&#128200; StockViz</h1>
  <div class="controls">
    <input type="text" id="ticker" placeholder="AAPL">
    <input type="date" id="start">
    <input type="date" id="end">
    <select id="interval">
      <option value="1d">1 day</option>
      <option value="1h">1 hour</option>
      <option value="15m">15 min</option>
    </select>
    <div class="toggle-group">
      <input type="checkbox" id="show_ma"><label for="show_ma">MA</label>
      <input type="checkbox" id="show_rsi"><label for="show_rsi">RSI</label>
      <input type="checkbox" id="show_boll"><label for="show_boll">Bollinger</label>
    </div>
    <button id="update">Update Chart</button>
    <select id="export_format">
      <option value="png">PNG</option>
      <option value="html">HTML</option>
    </select>
    <button id="export">Export</button>
  </div>
</div>

<div id="message"></div>
<h2 id="chart-title"></h2>
<div id="price-chart"></div>
<div id="rsi-block">
  <h2 id="rsi-title">Relative Strength Index</h2>
  <div id="rsi-chart"></div>
</div>

<div class="section">
  <h2>Upload Portfolio CSV or Excel</h2>
  <input type="file" id="portfolio_file" accept=".csv,.xlsx">
  <div id="portfolio_summary" style="margin-top:8px;font-size:13px;"></div>
  <div id="portfolio_table" style="margin-top:8px;max-height:240px;overflow:auto;"></div>
</div>

<div class="section">
  <h2>Save / Load Configuration</h2>
  <button id="save_config">Save Config</button>
  <input type="file" id="config_file" accept=".json">
</div>

<script>
const LINE_COLORS = ["#2196f3", "#ff9800", "#9c27b0", "#607d8b"];
let priceChart = null, rsiChart = null;

const el = id => document.getElementById(id);

function showMessage(text, ok) {
  const box = el("message");
  box.textContent = text;
  box.className = ok ? "info" : "";
  box.style.display = "block";
}
function clearMessage() { el("message").style.display = "none"; }

function controlsQuery() {
  const params = new URLSearchParams({
    ticker: el("ticker").value || "AAPL",
    start: el("start").value,
    end: el("end").value,
    interval: el("interval").value,
    show_ma: el("show_ma").checked,
    show_rsi: el("show_rsi").checked,
    show_boll: el("show_boll").checked,
  });
  return params.toString();
}

function renderSpec(spec, container) {
  container.innerHTML = "";
  const chart = LightweightCharts.createChart(container, {
    layout: { background: { color: "#131722" }, textColor: "#d1d4dc" },
    grid: { vertLines: { color: "#1e222d" }, horzLines: { color: "#1e222d" } },
    timeScale: { timeVisible: true },
    autoSize: true,
  });
  let lineIndex = 0, firstSeries = null;
  for (const trace of spec.traces) {
    if (trace.kind === "candlestick") {
      const series = chart.addCandlestickSeries({
        upColor: "#00c853", downColor: "#ff5252",
        wickUpColor: "#00c853", wickDownColor: "#ff5252", borderVisible: false,
      });
      series.setData(trace.bars);
      if (!firstSeries) firstSeries = series;
    } else {
      const series = chart.addLineSeries({
        color: LINE_COLORS[lineIndex++ % LINE_COLORS.length],
        lineWidth: 1, title: trace.name,
      });
      series.setData(trace.points);
      if (!firstSeries) firstSeries = series;
    }
  }
  for (const ref of spec.reference_lines) {
    if (firstSeries) firstSeries.createPriceLine({
      price: ref.value, color: ref.color,
      lineStyle: LightweightCharts.LineStyle.Dashed, title: ref.label,
    });
  }
  chart.timeScale().fitContent();
  return chart;
}

async function updateChart() {
  clearMessage();
  const resp = await fetch("/api/v1/chart?" + controlsQuery());
  const body = await resp.json();
  if (!resp.ok) { showMessage(body.error || "chart request failed", false); return; }

  el("chart-title").textContent = body.price.title +
    (body.candle_count === 0 ? " — no data for this selection" : "");
  if (priceChart) priceChart.remove();
  priceChart = renderSpec(body.price, el("price-chart"));

  if (body.rsi) {
    el("rsi-block").style.display = "block";
    if (rsiChart) rsiChart.remove();
    rsiChart = renderSpec(body.rsi, el("rsi-chart"));
  } else {
    if (rsiChart) { rsiChart.remove(); rsiChart = null; }
    el("rsi-block").style.display = "none";
  }
}

function applyConfig(cfg) {
  el("ticker").value = cfg.ticker;
  el("start").value = cfg.start_date;
  el("end").value = cfg.end_date;
  el("interval").value = cfg.interval;
  el("show_ma").checked = cfg.show_ma;
  el("show_rsi").checked = cfg.show_rsi;
  el("show_boll").checked = cfg.show_boll;
}

async function pushConfig() {
  await fetch("/api/v1/config", {
    method: "POST",
    headers: { "Content-Type": "application/json" },
    body: JSON.stringify({
      ticker: el("ticker").value || "AAPL",
      start_date: el("start").value,
      end_date: el("end").value,
      interval: el("interval").value,
      show_ma: el("show_ma").checked,
      show_rsi: el("show_rsi").checked,
      show_boll: el("show_boll").checked,
    }),
  });
}

el("update").addEventListener("click", async () => { await pushConfig(); await updateChart(); });
for (const id of ["show_ma", "show_rsi", "show_boll", "interval"]) {
  el(id).addEventListener("change", async () => { await pushConfig(); await updateChart(); });
}

el("export").addEventListener("click", () => {
  window.location = "/api/v1/export?" + controlsQuery() + "&format=" + el("export_format").value;
});

el("portfolio_file").addEventListener("change", async () => {
  clearMessage();
  const file = el("portfolio_file").files[0];
  if (!file) return;
  const form = new FormData();
  form.append("file", file);
  const resp = await fetch("/api/v1/portfolio", { method: "POST", body: form });
  const body = await resp.json();
  if (!resp.ok) { showMessage(body.error || "portfolio upload failed", false); return; }

  if (body.error) showMessage(body.error, false);
  else showMessage("Detected " + body.ticker_count + " unique tickers.", true);

  el("portfolio_summary").textContent = body.tickers
    ? "Tickers: " + body.tickers.join(", ") : "";
  const table = ["<table><tr>"];
  for (const col of body.columns) table.push("<th>" + col + "</th>");
  table.push("</tr>");
  for (const row of body.rows) {
    table.push("<tr>");
    for (const cell of row) table.push("<td>" + cell + "</td>");
    table.push("</tr>");
  }
  table.push("</table>");
  el("portfolio_table").innerHTML = table.join("");
});

el("save_config").addEventListener("click", async () => {
  await pushConfig();
  window.location = "/api/v1/config/export";
});

el("config_file").addEventListener("change", async () => {
  clearMessage();
  const file = el("config_file").files[0];
  if (!file) return;
  const form = new FormData();
  form.append("file", file);
  const resp = await fetch("/api/v1/config/import", { method: "POST", body: form });
  const body = await resp.json();
  if (!resp.ok) { showMessage(body.error || "config import failed", false); return; }
  applyConfig(body.applied);
  showMessage("Configuration loaded and applied.", true);
  await updateChart();
});

(async function init() {
  const resp = await fetch("/api/v1/config");
  if (resp.ok) applyConfig(await resp.json());
  await updateChart();
})();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_wires_every_control() {
        for id in [
            "ticker",
            "start",
            "end",
            "interval",
            "show_ma",
            "show_rsi",
            "show_boll",
            "export_format",
            "export",
            "portfolio_file",
            "save_config",
            "config_file",
        ] {
            assert!(PAGE.contains(&format!("id=\"{id}\"")), "missing control {id}");
        }
    }

    #[test]
    fn page_talks_to_the_api() {
        for endpoint in [
            "/api/v1/chart",
            "/api/v1/export",
            "/api/v1/portfolio",
            "/api/v1/config",
            "/api/v1/config/export",
            "/api/v1/config/import",
        ] {
            assert!(PAGE.contains(endpoint), "missing endpoint {endpoint}");
        }
    }
}
