// =============================================================================
// Exporter — chart serialization to downloadable artifacts
// =============================================================================
//
// Two targets: a self-contained interactive HTML document (viewable without
// this process) and a rasterized PNG.  Failures here are recoverable and
// user-visible; nothing in this module may take the session down.

pub mod html;
pub mod png;

pub use html::render_html;
pub use png::render_png;

use thiserror::Error;

use crate::types::ExportFormat;

/// Failures while producing an export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The rasterizer could not draw the chart (backend or geometry failure).
    #[error("failed to rasterize chart: {0}")]
    Render(String),

    /// The drawn chart could not be encoded into the target format.
    #[error("failed to encode exported chart: {0}")]
    Encode(String),
}

/// Download filename for an exported chart: `{ticker}_chart.{ext}`.
pub fn export_file_name(ticker: &str, format: ExportFormat) -> String {
    format!("{}_chart.{}", ticker, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_matches_download_contract() {
        assert_eq!(export_file_name("AAPL", ExportFormat::Png), "AAPL_chart.png");
        assert_eq!(
            export_file_name("MSFT", ExportFormat::Html),
            "MSFT_chart.html"
        );
    }
}
