// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`; the dashboard page is served at `/`.
// Every interaction re-runs the pipeline for exactly the arguments the
// request names: fetch (cache-first) → indicators → chart build → respond.
//
// Failure policy: recoverable errors (bad arguments, file parsing, export,
// provider trouble) become JSON error bodies with a matching status code;
// nothing here takes the process down.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::chart::{build_price_chart, build_rsi_chart, ChartSpec};
use crate::chart_config::ChartConfig;
use crate::export::{export_file_name, render_html, render_png, ExportError};
use crate::market_data::SeriesKey;
use crate::portfolio::parse_portfolio;
use crate::types::{ExportFormat, Interval};
use crate::yahoo::FetchError;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Dashboard page ──────────────────────────────────────────
        .route("/", get(super::page::index_page))
        // ── API ─────────────────────────────────────────────────────
        .route("/api/v1/health", get(health))
        .route("/api/v1/chart", get(chart))
        .route("/api/v1/export", get(export_chart))
        .route("/api/v1/portfolio", post(upload_portfolio))
        .route("/api/v1/config", get(get_config).post(set_config))
        .route("/api/v1/config/export", get(export_config))
        .route("/api/v1/config/import", post(import_config))
        // ── Middleware & State ──────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error plumbing
// =============================================================================

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_body(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

/// Map a fetch failure to its status code and record it for the dashboard.
fn fetch_error(state: &AppState, e: FetchError) -> ApiError {
    let status = match &e {
        FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FetchError::BudgetExhausted => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::BAD_GATEWAY,
    };
    let message = e.to_string();
    warn!(error = %message, "fetch failed");
    state.push_error(message.clone());
    error_body(status, message)
}

/// Export failures are recoverable: report, never crash the session.
fn export_error(state: &AppState, e: ExportError) -> ApiError {
    let message = e.to_string();
    warn!(error = %message, "export failed");
    state.push_error(message.clone());
    error_body(StatusCode::INTERNAL_SERVER_ERROR, message)
}

// =============================================================================
// Health (public)
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_seconds: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };
    Json(resp)
}

// =============================================================================
// Chart pipeline
// =============================================================================

/// Query parameters accepted by the chart and export endpoints.  Absent
/// fields fall back to the live configuration.
#[derive(Debug, Default, Deserialize)]
struct ChartQuery {
    ticker: Option<String>,
    start: Option<String>,
    end: Option<String>,
    interval: Option<String>,
    show_ma: Option<bool>,
    show_rsi: Option<bool>,
    show_boll: Option<bool>,
    /// Export endpoint only; ignored by `/api/v1/chart`.
    format: Option<String>,
}

/// Overlay query parameters onto the base configuration and validate the
/// result.
fn merge_query(base: &ChartConfig, q: &ChartQuery) -> Result<ChartConfig, String> {
    let mut cfg = base.clone();
    if let Some(v) = &q.ticker {
        cfg.ticker = v.clone();
    }
    if let Some(v) = &q.start {
        cfg.start_date = v.clone();
    }
    if let Some(v) = &q.end {
        cfg.end_date = v.clone();
    }
    if let Some(v) = &q.interval {
        cfg.interval = Interval::from_str(v)?;
    }
    if let Some(v) = q.show_ma {
        cfg.show_ma = v;
    }
    if let Some(v) = q.show_rsi {
        cfg.show_rsi = v;
    }
    if let Some(v) = q.show_boll {
        cfg.show_boll = v;
    }
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

struct BuiltCharts {
    config: ChartConfig,
    candle_count: usize,
    price: ChartSpec,
    rsi: Option<ChartSpec>,
}

/// The whole interaction cycle: resolve settings, fetch (cache-first),
/// compute indicators, assemble chart specs.
async fn run_pipeline(state: &AppState, q: &ChartQuery) -> Result<BuiltCharts, ApiError> {
    let base = state.chart_config.read().clone();
    let cfg = merge_query(&base, q).map_err(|m| error_body(StatusCode::BAD_REQUEST, m))?;

    let (start, end) = cfg
        .date_range()
        .map_err(|e| error_body(StatusCode::BAD_REQUEST, e.to_string()))?;
    let key = SeriesKey {
        ticker: cfg.normalized_ticker(),
        start,
        end,
        interval: cfg.interval,
    };

    let candles = state
        .load_candles(&key)
        .await
        .map_err(|e| fetch_error(state, e))?;

    let price = build_price_chart(&key.ticker, &candles, cfg.show_ma, cfg.show_boll);
    let rsi = cfg.show_rsi.then(|| build_rsi_chart(&candles));

    Ok(BuiltCharts {
        config: cfg,
        candle_count: candles.len(),
        price,
        rsi,
    })
}

#[derive(Serialize)]
struct ChartResponse {
    ticker: String,
    interval: Interval,
    candle_count: usize,
    price: ChartSpec,
    rsi: Option<ChartSpec>,
}

async fn chart(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChartQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let built = run_pipeline(&state, &q).await?;
    Ok(Json(ChartResponse {
        ticker: built.config.normalized_ticker(),
        interval: built.config.interval,
        candle_count: built.candle_count,
        price: built.price,
        rsi: built.rsi,
    }))
}

// =============================================================================
// Export
// =============================================================================

async fn export_chart(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ChartQuery>,
) -> Result<Response, ApiError> {
    let format = q
        .format
        .as_deref()
        .unwrap_or("png")
        .parse::<ExportFormat>()
        .map_err(|m| error_body(StatusCode::BAD_REQUEST, m))?;

    let built = run_pipeline(&state, &q).await?;
    let ticker = built.config.normalized_ticker();
    let file_name = export_file_name(&ticker, format);
    info!(ticker = %ticker, format = %format, "exporting chart");

    match format {
        ExportFormat::Html => {
            let doc =
                render_html(&built.price, built.rsi.as_ref()).map_err(|e| export_error(&state, e))?;
            Ok((
                [
                    (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                doc,
            )
                .into_response())
        }
        ExportFormat::Png => {
            let bytes = render_png(&built.price).map_err(|e| export_error(&state, e))?;
            Ok((
                [
                    (header::CONTENT_TYPE, "image/png".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{file_name}\""),
                    ),
                ],
                bytes,
            )
                .into_response())
        }
    }
}

// =============================================================================
// Portfolio upload
// =============================================================================

async fn upload_portfolio(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, data) = read_upload(&mut multipart).await?;

    let table = parse_portfolio(&file_name, &data).map_err(|e| {
        let message = e.to_string();
        state.push_error(message.clone());
        error_body(StatusCode::UNPROCESSABLE_ENTITY, message)
    })?;

    let tickers = table.unique_tickers();
    *state.portfolio.write() = Some(table.clone());
    state.increment_version();

    match tickers {
        Ok(tickers) => {
            info!(
                file_name = %file_name,
                rows = table.rows.len(),
                unique_tickers = tickers.len(),
                "portfolio uploaded"
            );
            Ok(Json(json!({
                "file_name": file_name,
                "columns": table.columns,
                "rows": table.rows,
                "tickers": tickers,
                "ticker_count": tickers.len(),
            })))
        }
        Err(e) => {
            // The table itself is fine — report the missing column alongside
            // it and keep the session usable.
            let message = e.to_string();
            warn!(file_name = %file_name, error = %message, "portfolio has no ticker column");
            state.push_error(message.clone());
            Ok(Json(json!({
                "file_name": file_name,
                "columns": table.columns,
                "rows": table.rows,
                "tickers": serde_json::Value::Null,
                "ticker_count": 0,
                "error": message,
            })))
        }
    }
}

/// Pull the uploaded file (preferring a field named "file") out of a
/// multipart body.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error_body(StatusCode::BAD_REQUEST, format!("invalid multipart body: {e}")))?
    {
        let is_file_field = field.name() == Some("file");
        if is_file_field || upload.is_none() {
            let name = field.file_name().unwrap_or("upload").to_string();
            let data = field.bytes().await.map_err(|e| {
                error_body(StatusCode::BAD_REQUEST, format!("failed to read upload: {e}"))
            })?;
            upload = Some((name, data.to_vec()));
            if is_file_field {
                break;
            }
        }
    }

    upload.ok_or_else(|| error_body(StatusCode::BAD_REQUEST, "no file in upload"))
}

// =============================================================================
// Configuration
// =============================================================================

async fn get_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chart_config.read().clone())
}

/// Partial update: absent fields keep their current values.
#[derive(Debug, Default, Deserialize)]
struct ConfigUpdate {
    ticker: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    interval: Option<Interval>,
    show_ma: Option<bool>,
    show_rsi: Option<bool>,
    show_boll: Option<bool>,
}

fn apply_update(base: &ChartConfig, update: &ConfigUpdate) -> Result<ChartConfig, String> {
    let mut cfg = base.clone();
    if let Some(v) = &update.ticker {
        cfg.ticker = v.clone();
    }
    if let Some(v) = &update.start_date {
        cfg.start_date = v.clone();
    }
    if let Some(v) = &update.end_date {
        cfg.end_date = v.clone();
    }
    if let Some(v) = update.interval {
        cfg.interval = v;
    }
    if let Some(v) = update.show_ma {
        cfg.show_ma = v;
    }
    if let Some(v) = update.show_rsi {
        cfg.show_rsi = v;
    }
    if let Some(v) = update.show_boll {
        cfg.show_boll = v;
    }
    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

/// Swap in the new configuration, bump the version, and persist best-effort
/// outside the lock.
fn apply_and_save(state: &AppState, cfg: ChartConfig) {
    *state.chart_config.write() = cfg.clone();
    state.increment_version();
    if let Err(e) = cfg.save(&state.config_path) {
        warn!(error = %e, "failed to persist chart config");
    }
}

async fn set_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ConfigUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let current = state.chart_config.read().clone();
    let updated =
        apply_update(&current, &update).map_err(|m| error_body(StatusCode::BAD_REQUEST, m))?;

    info!(ticker = %updated.ticker, interval = %updated.interval, "configuration updated");
    apply_and_save(&state, updated.clone());
    Ok(Json(updated))
}

/// Download the current settings as `config.json`.
async fn export_config(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let cfg = state.chart_config.read().clone();
    let text = cfg
        .to_json_string()
        .map_err(|e| error_body(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"config.json\"".to_string(),
            ),
        ],
        text,
    )
        .into_response())
}

/// Upload a configuration document.  The parsed settings are applied to the
/// live controls and persisted — not merely displayed.
async fn import_config(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, data) = read_upload(&mut multipart).await?;
    let text = String::from_utf8(data).map_err(|_| {
        error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            "configuration file is not UTF-8 text",
        )
    })?;

    let cfg = ChartConfig::from_json_str(&text)
        .and_then(|cfg| {
            cfg.validate()?;
            Ok(cfg)
        })
        .map_err(|e| {
            let message = format!("failed to load configuration: {e}");
            state.push_error(message.clone());
            error_body(StatusCode::UNPROCESSABLE_ENTITY, message)
        })?;

    info!(file_name = %file_name, ticker = %cfg.ticker, "configuration imported and applied");
    apply_and_save(&state, cfg.clone());

    Ok(Json(json!({
        "applied": cfg,
        "message": "configuration applied",
    })))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_query_defaults_to_base_config() {
        let base = ChartConfig::default();
        let cfg = merge_query(&base, &ChartQuery::default()).unwrap();
        assert_eq!(cfg, base);
    }

    #[test]
    fn merge_query_overlays_every_field() {
        let base = ChartConfig::default();
        let q = ChartQuery {
            ticker: Some("msft".into()),
            start: Some("2021-06-01".into()),
            end: Some("2021-12-31".into()),
            interval: Some("1h".into()),
            show_ma: Some(true),
            show_rsi: Some(true),
            show_boll: Some(false),
            format: None,
        };
        let cfg = merge_query(&base, &q).unwrap();
        assert_eq!(cfg.ticker, "msft");
        assert_eq!(cfg.normalized_ticker(), "MSFT");
        assert_eq!(cfg.interval, Interval::Hourly);
        assert!(cfg.show_ma);
        assert!(cfg.show_rsi);
        assert!(!cfg.show_boll);
    }

    #[test]
    fn merge_query_rejects_bad_interval_and_dates() {
        let base = ChartConfig::default();

        let bad_interval = ChartQuery {
            interval: Some("3m".into()),
            ..ChartQuery::default()
        };
        assert!(merge_query(&base, &bad_interval).is_err());

        let inverted_range = ChartQuery {
            start: Some("2023-01-01".into()),
            end: Some("2022-01-01".into()),
            ..ChartQuery::default()
        };
        assert!(merge_query(&base, &inverted_range).is_err());
    }

    #[test]
    fn apply_update_is_partial() {
        let base = ChartConfig::default();
        let update = ConfigUpdate {
            show_rsi: Some(true),
            ..ConfigUpdate::default()
        };
        let cfg = apply_update(&base, &update).unwrap();
        assert!(cfg.show_rsi);
        assert_eq!(cfg.ticker, base.ticker);
        assert_eq!(cfg.interval, base.interval);
    }

    #[test]
    fn apply_update_validates_result() {
        let base = ChartConfig::default();
        let update = ConfigUpdate {
            ticker: Some("  ".into()),
            ..ConfigUpdate::default()
        };
        assert!(apply_update(&base, &update).is_err());
    }
}
