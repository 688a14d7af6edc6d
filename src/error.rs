// =============================================================================
// Error taxonomy for the fetch and sentiment layers
// =============================================================================
//
// Every failure a dashboard section can hit falls into one of four kinds.
// Sections keep the kind alongside the message so the display can tell a dead
// network apart from an anti-bot rejection or an empty option chain.
// =============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PulseError {
    /// Transport failure or unreachable provider.
    #[error("network error: {0}")]
    Network(String),

    /// Body did not match the expected JSON shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed response with nothing usable in it.
    #[error("no data: {0}")]
    NoData(String),

    /// Metric preconditions not met (empty table, zero denominator).
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type PulseResult<T> = Result<T, PulseError>;

impl PulseError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoData(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) => ErrorKind::Network,
            Self::Parse(_) => ErrorKind::Parse,
            Self::NoData(_) => ErrorKind::NoData,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// The message without the kind prefix added by `Display`.
    pub fn message(&self) -> &str {
        match self {
            Self::Network(m) | Self::Parse(m) | Self::NoData(m) | Self::InvalidInput(m) => m,
        }
    }
}

/// Serialisable discriminant of [`PulseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Network,
    Parse,
    NoData,
    InvalidInput,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "NETWORK"),
            Self::Parse => write!(f, "PARSE"),
            Self::NoData => write!(f, "NO_DATA"),
            Self::InvalidInput => write!(f, "INVALID_INPUT"),
        }
    }
}
