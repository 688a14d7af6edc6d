// =============================================================================
// Index History Fetcher: Yahoo Finance chart API
// =============================================================================
//
// Pulls daily bars for an index ticker (e.g. `^NSEI`, `^INDIAVIX`) and keeps
// the trailing `window_days` trading sessions, oldest first.
//
// The chart endpoint is queried by calendar span rather than by `range=` so
// that any window length works; the span is wide enough to cover weekends and
// exchange holidays, and the surplus is trimmed after parsing.
// =============================================================================

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::error::{PulseError, PulseResult};
use crate::runtime_config::RuntimeConfig;
use crate::types::PricePoint;

/// Yahoo Finance chart API client.
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> PulseResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| PulseError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RuntimeConfig) -> PulseResult<Self> {
        Self::new(
            config.yahoo_base_url.clone(),
            &config.user_agent,
            config.request_timeout(),
        )
    }

    /// GET /v8/finance/chart/{symbol}: daily closes for the trailing window.
    ///
    /// Fails with `Network` when the provider is unreachable, `Parse` when
    /// the body is not chart JSON, and `NoData` when the provider reports an
    /// error for the symbol or returns no usable closes.
    #[instrument(skip(self), name = "yahoo::get_index_history")]
    pub async fn get_index_history(
        &self,
        symbol: &str,
        window_days: u32,
    ) -> PulseResult<Vec<PricePoint>> {
        if window_days == 0 {
            return Err(PulseError::invalid_input("window_days must be at least 1"));
        }

        let now = Utc::now();
        let span_days = i64::from(window_days) * 2 + 7;
        let period1 = TimeDelta::try_days(span_days)
            .and_then(|span| now.checked_sub_signed(span))
            .ok_or_else(|| {
                PulseError::invalid_input(format!(
                    "window_days {window_days} reaches past the representable date range"
                ))
            })?
            .timestamp();
        let period2 = now.timestamp();

        let url = format!("{}/v8/finance/chart/{}", self.base_url, encode_symbol(symbol));

        let resp = self
            .client
            .get(&url)
            .query(&[("period1", period1), ("period2", period2)])
            .query(&[("interval", "1d"), ("events", "history")])
            .send()
            .await
            .map_err(|e| PulseError::network(format!("GET chart for {symbol}: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| PulseError::network(format!("reading chart body for {symbol}: {e}")))?;

        if !status.is_success() {
            warn!(symbol, %status, "chart endpoint returned non-success status");
        }

        let points = parse_chart(symbol, &body, window_days)?;
        debug!(symbol, count = points.len(), "index history fetched");
        Ok(points)
    }
}

/// Percent-encode everything outside the unreserved set (`^NSEI` -> `%5ENSEI`).
fn encode_symbol(symbol: &str) -> String {
    symbol
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

// Yahoo Finance chart response structures

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds; bars are dated in exchange time.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn column(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten().filter(|v| v.is_finite())
}

/// Turn a chart body into the trailing `window_days` closes, oldest first.
fn parse_chart(symbol: &str, body: &str, window_days: u32) -> PulseResult<Vec<PricePoint>> {
    let envelope: ChartEnvelope = serde_json::from_str(body)
        .map_err(|e| PulseError::parse(format!("chart response for {symbol}: {e}")))?;

    if let Some(err) = envelope.chart.error {
        let description = err
            .description
            .or(err.code)
            .unwrap_or_else(|| "unspecified provider error".to_string());
        return Err(PulseError::no_data(format!("{symbol}: {description}")));
    }

    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| PulseError::no_data(format!("{symbol}: empty chart result")))?;

    let offset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut points: Vec<PricePoint> = Vec::with_capacity(result.timestamp.len());

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let Some(close) = column(&quote.close, i) else {
            continue;
        };
        let Some(date) = DateTime::from_timestamp(ts + offset, 0).map(|dt| dt.date_naive()) else {
            continue;
        };

        let point = PricePoint {
            date,
            close,
            open: column(&quote.open, i),
            high: column(&quote.high, i),
            low: column(&quote.low, i),
            volume: column(&quote.volume, i).map(|v| v.max(0.0) as u64),
        };

        // During market hours the provider appends a live bar that can share
        // a date with the last daily bar; the later one wins.
        match points.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => points.push(point),
        }
    }

    points.sort_by_key(|p| p.date);

    if points.is_empty() {
        return Err(PulseError::no_data(format!("{symbol}: no closing prices in window")));
    }

    let keep = window_days as usize;
    if points.len() > keep {
        points.drain(..points.len() - keep);
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::market_data::test_support::{chart_json, spawn_yahoo_mock};
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn encode_symbol_escapes_caret() {
        assert_eq!(encode_symbol("^NSEI"), "%5ENSEI");
        assert_eq!(encode_symbol("RELIANCE.NS"), "RELIANCE.NS");
    }

    #[test]
    fn parse_keeps_trailing_window_in_order() {
        let body = chart_json(&[
            (5, Some(100.0)),
            (6, Some(101.0)),
            (7, Some(102.0)),
            (8, Some(103.0)),
            (9, Some(104.0)),
            (12, Some(105.0)),
            (13, Some(106.0)),
        ])
        .to_string();

        let points = parse_chart("^NSEI", &body, 5).unwrap();
        assert_eq!(points.len(), 5);
        assert_eq!(points[0].date, date(7));
        assert_eq!(points[4].date, date(13));
        assert!((points[4].close - 106.0).abs() < 1e-10);
    }

    #[test]
    fn parse_skips_null_closes() {
        let body = chart_json(&[(12, Some(100.0)), (13, None), (14, Some(102.0))]).to_string();
        let points = parse_chart("^NSEI", &body, 5).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, date(14));
    }

    #[test]
    fn parse_dates_bars_in_exchange_time() {
        // 20:00 UTC on the 12th is 01:30 IST on the 13th.
        let ts = date(12).and_hms_opt(20, 0, 0).unwrap().and_utc().timestamp();
        let body = serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 19800 },
                    "timestamp": [ts],
                    "indicators": { "quote": [{ "close": [15.5] }] }
                }],
                "error": null
            }
        })
        .to_string();

        let points = parse_chart("^INDIAVIX", &body, 5).unwrap();
        assert_eq!(points[0].date, date(13));
    }

    #[test]
    fn parse_live_bar_replaces_same_day_bar() {
        let first = date(14).and_hms_opt(3, 45, 0).unwrap().and_utc().timestamp();
        let live = date(14).and_hms_opt(8, 0, 0).unwrap().and_utc().timestamp();
        let body = serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "gmtoffset": 19800 },
                    "timestamp": [first, live],
                    "indicators": { "quote": [{ "close": [100.0, 101.5] }] }
                }],
                "error": null
            }
        })
        .to_string();

        let points = parse_chart("^NSEI", &body, 5).unwrap();
        assert_eq!(points.len(), 1);
        assert!((points[0].close - 101.5).abs() < 1e-10);
    }

    #[test]
    fn provider_error_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("^BOGUS", body, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
        assert!(err.message().contains("delisted"));
    }

    #[test]
    fn all_null_closes_is_no_data() {
        let body = chart_json(&[(12, None), (13, None)]).to_string();
        let err = parse_chart("^NSEI", &body, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
    }

    #[test]
    fn html_body_is_parse_error() {
        let err = parse_chart("^NSEI", "<html>Too Many Requests</html>", 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[tokio::test]
    async fn fetches_from_provider() {
        let base = spawn_yahoo_mock().await;
        let client = YahooClient::new(base, "Mozilla/5.0", Duration::from_secs(5)).unwrap();

        let points = client.get_index_history("^NSEI", 5).await.unwrap();
        assert_eq!(points.len(), 5);
        assert!(points.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[tokio::test]
    async fn unknown_symbol_from_provider_is_no_data() {
        let base = spawn_yahoo_mock().await;
        let client = YahooClient::new(base, "Mozilla/5.0", Duration::from_secs(5)).unwrap();

        let err = client.get_index_history("^BOGUS", 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoData);
    }

    #[tokio::test]
    async fn unreachable_provider_is_network_error() {
        let client =
            YahooClient::new("http://127.0.0.1:1", "Mozilla/5.0", Duration::from_secs(2)).unwrap();
        let err = client.get_index_history("^NSEI", 5).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[tokio::test]
    async fn zero_window_is_rejected() {
        let client =
            YahooClient::new("http://127.0.0.1:1", "Mozilla/5.0", Duration::from_secs(2)).unwrap();
        let err = client.get_index_history("^NSEI", 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn oversized_window_is_rejected() {
        let client =
            YahooClient::new("http://127.0.0.1:1", "Mozilla/5.0", Duration::from_secs(2)).unwrap();
        let err = client.get_index_history("^NSEI", u32::MAX).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
