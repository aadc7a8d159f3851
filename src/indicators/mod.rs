// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators the dashboard can
// overlay.  Every function returns a series aligned index-for-index with its
// input; positions where the rolling window has insufficient history are
// `None`, so callers are forced to handle short series instead of crashing
// on them.

pub mod bollinger;
pub mod rsi;
pub mod sma;

pub use bollinger::{bollinger_bands, BollingerSeries};
pub use rsi::rsi;
pub use sma::moving_average;
