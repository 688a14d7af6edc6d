// =============================================================================
// Shared types used across the Nifty Pulse pipeline
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar from the market-data provider. Only `close` is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<u64>,
}

#[cfg(test)]
impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
        }
    }
}

/// Open interest for a single strike where both legs are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChainRow {
    pub strike_price: f64,
    /// Call open interest.
    pub ce_oi: i64,
    /// Put open interest.
    pub pe_oi: i64,
    /// Call change in open interest (may be negative).
    pub ce_chng_oi: i64,
    /// Put change in open interest (may be negative).
    pub pe_chng_oi: i64,
}

#[cfg(test)]
impl OptionChainRow {
    pub fn new(strike_price: f64, ce_oi: i64, pe_oi: i64) -> Self {
        Self {
            strike_price,
            ce_oi,
            pe_oi,
            ce_chng_oi: 0,
            pe_chng_oi: 0,
        }
    }
}

/// A parsed option chain plus the exchange metadata that came with it.
///
/// Rows keep the exchange's order. Duplicate strikes are not merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    pub symbol: String,
    /// Exchange-side timestamp string, e.g. "16-Oct-2026 15:30:00".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying_value: Option<f64>,
    pub rows: Vec<OptionChainRow>,
}
