// =============================================================================
// Portfolio Importer — uploaded CSV / spreadsheet parsing
// =============================================================================
//
// Format is inferred from the uploaded file name: a `.csv` extension means
// comma-separated text, anything else (notably `.xlsx`) is treated as a
// spreadsheet binary.  Every failure here is recoverable: the handler reports
// the message and the session continues.

use std::io::Cursor;

use calamine::{Reader, Xlsx};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// The column the ticker set is derived from.  Matched literally.
pub const TICKER_COLUMN: &str = "Ticker";

/// Failures while importing a portfolio file.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("could not load portfolio: {0}")]
    Parse(String),

    #[error("portfolio file is missing required column '{0}'")]
    MissingColumn(String),
}

/// An uploaded portfolio as an ordered table of strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl PortfolioTable {
    /// The distinct, non-empty values of the `Ticker` column, first-seen
    /// order preserved.
    ///
    /// Errors when the table has no column literally named `Ticker`.
    pub fn unique_tickers(&self) -> Result<Vec<String>, PortfolioError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c == TICKER_COLUMN)
            .ok_or_else(|| PortfolioError::MissingColumn(TICKER_COLUMN.to_string()))?;

        let mut seen = std::collections::HashSet::new();
        let mut tickers = Vec::new();
        for row in &self.rows {
            let Some(value) = row.get(idx) else { continue };
            let value = value.trim();
            if !value.is_empty() && seen.insert(value.to_string()) {
                tickers.push(value.to_string());
            }
        }
        Ok(tickers)
    }
}

/// Parse an uploaded portfolio file into a table.
pub fn parse_portfolio(file_name: &str, bytes: &[u8]) -> Result<PortfolioTable, PortfolioError> {
    let table = if file_name.to_ascii_lowercase().ends_with(".csv") {
        parse_csv(bytes)?
    } else {
        parse_xlsx(bytes)?
    };
    debug!(
        file_name,
        columns = table.columns.len(),
        rows = table.rows.len(),
        "portfolio file parsed"
    );
    Ok(table)
}

// ---------------------------------------------------------------------------
// Format-specific parsers
// ---------------------------------------------------------------------------

fn parse_csv(bytes: &[u8]) -> Result<PortfolioTable, PortfolioError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| PortfolioError::Parse(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| PortfolioError::Parse(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(PortfolioTable { columns, rows })
}

fn parse_xlsx(bytes: &[u8]) -> Result<PortfolioTable, PortfolioError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| PortfolioError::Parse(e.to_string()))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| PortfolioError::Parse("workbook has no sheets".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| PortfolioError::Parse(e.to_string()))?;

    let mut rows_iter = range.rows();
    let columns: Vec<String> = rows_iter
        .next()
        .map(|header| header.iter().map(|cell| cell.to_string()).collect())
        .unwrap_or_default();

    let rows = rows_iter
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();

    Ok(PortfolioTable { columns, rows })
}
