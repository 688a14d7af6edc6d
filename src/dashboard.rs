// =============================================================================
// Dashboard Snapshot: Everything one refresh cycle produced
// =============================================================================
//
// Each section is guarded on its own: a failed option-chain fetch leaves the
// index and VIX sections intact and records the failure kind in place of the
// missing data.
//
// Renderers consume four shapes from the snapshot:
//   metrics()     (label, value) pairs
//   table()       option-chain rows
//   series()      dated closes per instrument
//   advisories()  volatility-keyed strategy text
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, PulseError, PulseResult};
use crate::sentiment::SentimentSummary;
use crate::strategy::Advisory;
use crate::types::{OptionChainRow, OptionChainSnapshot, PricePoint};

/// Why a section has no data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PulseError> for SectionError {
    fn from(err: &PulseError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message().to_string(),
        }
    }
}

impl std::fmt::Display for SectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Failed(SectionError),
}

impl<T> Section<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SectionError> {
        match self {
            Self::Ready(_) => None,
            Self::Failed(e) => Some(e),
        }
    }
}

impl<T> From<PulseResult<T>> for Section<T> {
    fn from(result: PulseResult<T>) -> Self {
        match result {
            Ok(v) => Self::Ready(v),
            Err(e) => Self::Failed(SectionError::from(&e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: f64,
}

impl Metric {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// A named close-price series, ready for a line chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub points: Vec<SeriesPoint>,
}

/// Price history for one instrument plus its headline metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSection {
    pub symbol: String,
    pub label: String,
    /// Metric label shown next to the latest close ("Last Close", "Current VIX").
    pub metric_label: String,
    pub history: Vec<PricePoint>,
}

impl PriceSection {
    pub fn last_close(&self) -> Option<f64> {
        self.history.last().map(|p| p.close)
    }

    pub fn series(&self) -> Series {
        Series {
            label: self.label.clone(),
            points: self
                .history
                .iter()
                .map(|p| SeriesPoint {
                    date: p.date,
                    value: p.close,
                })
                .collect(),
        }
    }
}

/// Output of one refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Unique identifier for this cycle (UUID v4).
    pub run_id: String,
    /// ISO 8601 timestamp of when the cycle finished.
    pub generated_at: String,
    pub index: Section<PriceSection>,
    pub vix: Section<PriceSection>,
    pub option_chain: Section<OptionChainSnapshot>,
    pub sentiment: Section<SentimentSummary>,
    pub advisory: Section<Advisory>,
}

impl DashboardSnapshot {
    /// Headline numbers in display order. Failed sections contribute nothing.
    pub fn metrics(&self) -> Vec<Metric> {
        let mut metrics = Vec::new();

        for section in [&self.index, &self.vix] {
            if let Some(ps) = section.ready() {
                if let Some(close) = ps.last_close() {
                    metrics.push(Metric::new(ps.metric_label.clone(), close));
                }
            }
        }

        if let Some(s) = self.sentiment.ready() {
            metrics.push(Metric::new("Put/Call Ratio (PCR)", s.pcr));
            metrics.push(Metric::new("Max Pain Strike", s.max_pain_strike));
        }

        metrics
    }

    pub fn table(&self) -> Option<&[OptionChainRow]> {
        self.option_chain.ready().map(|c| c.rows.as_slice())
    }

    pub fn series(&self) -> Vec<Series> {
        [&self.index, &self.vix]
            .into_iter()
            .filter_map(|s| s.ready().map(PriceSection::series))
            .collect()
    }

    pub fn advisories(&self) -> Vec<&Advisory> {
        self.advisory.ready().into_iter().collect()
    }

    /// (section name, error) for every section that did not render.
    pub fn failures(&self) -> Vec<(&'static str, &SectionError)> {
        [
            ("index", self.index.error()),
            ("vix", self.vix.error()),
            ("option_chain", self.option_chain.error()),
            ("sentiment", self.sentiment.error()),
            ("advisory", self.advisory.error()),
        ]
        .into_iter()
        .filter_map(|(name, err)| err.map(|e| (name, e)))
        .collect()
    }
}
