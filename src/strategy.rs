// =============================================================================
// Strategy Suggestions: Volatility-keyed advisory text
// =============================================================================
//
// Maps the latest volatility-index close onto one of three regimes:
//
//   vix > high  =>  HIGH      (warning)  sell premium with defined risk
//   vix < low   =>  LOW       (info)     buy premium
//   otherwise   =>  MODERATE  (info)     range-bound premium selling
//
// The boundaries themselves are MODERATE.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::runtime_config::RuntimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolatilityRegime {
    High,
    Moderate,
    Low,
}

impl std::fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// How loudly the display should present the advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryLevel {
    Info,
    Warning,
}

/// VIX cut-offs for the three regimes.
#[derive(Debug, Clone, Copy)]
pub struct VixThresholds {
    pub high: f64,
    pub low: f64,
}

impl Default for VixThresholds {
    fn default() -> Self {
        Self { high: 18.0, low: 13.0 }
    }
}

impl From<&RuntimeConfig> for VixThresholds {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            high: config.vix_high_threshold,
            low: config.vix_low_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub regime: VolatilityRegime,
    pub level: AdvisoryLevel,
    /// The VIX close the advice was keyed on.
    pub vix: f64,
    pub message: String,
}

pub fn classify(vix: f64, thresholds: VixThresholds) -> VolatilityRegime {
    if vix > thresholds.high {
        VolatilityRegime::High
    } else if vix < thresholds.low {
        VolatilityRegime::Low
    } else {
        VolatilityRegime::Moderate
    }
}

/// Strategy text for the latest VIX close.
pub fn advise(vix: f64, thresholds: VixThresholds) -> Advisory {
    let regime = classify(vix, thresholds);
    let (level, message) = match regime {
        VolatilityRegime::High => (
            AdvisoryLevel::Warning,
            "High volatility: Consider credit spreads or iron condors.",
        ),
        VolatilityRegime::Low => (
            AdvisoryLevel::Info,
            "Low volatility: Consider buying options or debit spreads.",
        ),
        VolatilityRegime::Moderate => (
            AdvisoryLevel::Info,
            "Moderate volatility: Range-bound strategies like short straddles/strangles might work.",
        ),
    };

    Advisory {
        regime,
        level,
        vix,
        message: message.to_string(),
    }
}
