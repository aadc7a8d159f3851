// =============================================================================
// Shared types used across the StockViz dashboard
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sampling interval for a fetched price series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "15m")]
    FifteenMin,
}

impl Default for Interval {
    fn default() -> Self {
        Self::Daily
    }
}

impl Interval {
    /// The token the market-data provider expects in its query string.
    /// Identical to the serialized form.
    pub fn as_provider_str(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Hourly => "1h",
            Self::FifteenMin => "15m",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_provider_str())
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Self::Daily),
            "1h" => Ok(Self::Hourly),
            "15m" => Ok(Self::FifteenMin),
            other => Err(format!(
                "invalid interval '{other}' (expected one of: 1d, 1h, 15m)"
            )),
        }
    }
}

/// Target format for a chart export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    #[serde(rename = "png")]
    Png,
    #[serde(rename = "html")]
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Html => "html",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "html" => Ok(Self::Html),
            other => Err(format!(
                "invalid export format '{other}' (expected 'png' or 'html')"
            )),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_roundtrip() {
        for s in ["1d", "1h", "15m"] {
            let iv: Interval = s.parse().unwrap();
            assert_eq!(iv.to_string(), s);
            let json = serde_json::to_string(&iv).unwrap();
            assert_eq!(json, format!("\"{s}\""));
            let back: Interval = serde_json::from_str(&json).unwrap();
            assert_eq!(back, iv);
        }
    }

    #[test]
    fn interval_rejects_unknown() {
        assert!("5m".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn interval_default_is_daily() {
        assert_eq!(Interval::default(), Interval::Daily);
    }

    #[test]
    fn export_format_parse() {
        assert_eq!("png".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("HTML".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
