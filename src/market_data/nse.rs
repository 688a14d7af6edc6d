// =============================================================================
// Option Chain Fetcher: NSE public option-chain API
// =============================================================================
//
// The exchange rejects API calls that do not carry cookies from a prior visit
// to its web root, so every fetch is a two-step session:
//
//   1. GET {base}                      (User-Agent only, body drained)
//   2. GET {base}/api/option-chain-indices?symbol=...
//                                      (User-Agent + Referer, same cookie jar)
//
// A rejected session comes back as an HTML error page or an empty JSON object
// instead of `{records: {data: [...]}}`; both surface as a parse error.
//
// Each call builds and drops its own session, so cookies never leak between
// refresh cycles.
// =============================================================================

use std::time::Duration;

use reqwest::header::{REFERER, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{PulseError, PulseResult};
use crate::runtime_config::RuntimeConfig;
use crate::types::{OptionChainRow, OptionChainSnapshot};

/// Builds a fresh cookie session per option-chain request.
#[derive(Debug, Clone)]
pub struct NseOptionChainFetcher {
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl NseOptionChainFetcher {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            config.nse_base_url.clone(),
            config.user_agent.clone(),
            config.request_timeout(),
        )
    }

    fn referer(&self) -> String {
        format!("{}/", self.base_url)
    }

    /// Fetch and project the option chain for `symbol` (e.g. "NIFTY").
    #[instrument(skip(self), name = "nse::get_option_chain")]
    pub async fn get_option_chain(&self, symbol: &str) -> PulseResult<OptionChainSnapshot> {
        let session = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.timeout)
            .build()
            .map_err(|e| PulseError::network(format!("failed to build NSE session: {e}")))?;

        self.warm_up(&session).await?;

        let url = format!("{}/api/option-chain-indices", self.base_url);
        let resp = session
            .get(&url)
            .query(&[("symbol", symbol)])
            .header(USER_AGENT, &self.user_agent)
            .header(REFERER, self.referer())
            .send()
            .await
            .map_err(|e| PulseError::network(format!("GET option chain for {symbol}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PulseError::network(format!("reading option chain body: {e}")))?;

        let snapshot = parse_option_chain(symbol, &body).map_err(|e| match e {
            PulseError::Parse(msg) => PulseError::parse(format!("HTTP {status}: {msg}")),
            other => other,
        })?;

        debug!(
            symbol,
            rows = snapshot.rows.len(),
            underlying = ?snapshot.underlying_value,
            "option chain fetched"
        );
        Ok(snapshot)
    }

    /// Visit the web root so the session picks up the anti-bot cookies.
    async fn warm_up(&self, session: &reqwest::Client) -> PulseResult<()> {
        let resp = session
            .get(&self.base_url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| PulseError::network(format!("NSE warm-up request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "NSE warm-up returned non-success status; continuing");
        }
        // Drain the body so the connection can be reused for the data call.
        resp.bytes()
            .await
            .map_err(|e| PulseError::network(format!("NSE warm-up body read failed: {e}")))?;
        Ok(())
    }
}

// NSE option-chain response structures

#[derive(Debug, Deserialize)]
struct ChainEnvelope {
    records: ChainRecords,
}

#[derive(Debug, Deserialize)]
struct ChainRecords {
    data: Vec<ChainElement>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default, rename = "underlyingValue")]
    underlying_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChainElement {
    #[serde(default, rename = "CE")]
    call: Option<ChainLeg>,
    #[serde(default, rename = "PE")]
    put: Option<ChainLeg>,
}

#[derive(Debug, Deserialize)]
struct ChainLeg {
    #[serde(rename = "strikePrice")]
    strike_price: f64,
    #[serde(rename = "openInterest")]
    open_interest: f64,
    #[serde(rename = "changeinOpenInterest")]
    change_in_open_interest: f64,
}

/// Project `records.data` into rows, dropping strikes missing either leg.
pub fn parse_option_chain(symbol: &str, body: &str) -> PulseResult<OptionChainSnapshot> {
    let envelope: ChainEnvelope = serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(80).collect();
        PulseError::parse(format!("unexpected option chain body ({e}): {preview}"))
    })?;

    let records = envelope.records;
    let total = records.data.len();

    let rows: Vec<OptionChainRow> = records
        .data
        .into_iter()
        .filter_map(|element| match (element.call, element.put) {
            (Some(ce), Some(pe)) => Some(OptionChainRow {
                strike_price: ce.strike_price,
                ce_oi: ce.open_interest.round() as i64,
                pe_oi: pe.open_interest.round() as i64,
                ce_chng_oi: ce.change_in_open_interest.round() as i64,
                pe_chng_oi: pe.change_in_open_interest.round() as i64,
            }),
            _ => None,
        })
        .collect();

    if rows.len() < total {
        debug!(symbol, dropped = total - rows.len(), "dropped strikes with a missing leg");
    }

    Ok(OptionChainSnapshot {
        symbol: symbol.to_string(),
        exchange_timestamp: records.timestamp,
        underlying_value: records.underlying_value,
        rows,
    })
}
