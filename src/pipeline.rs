// =============================================================================
// Refresh Pipeline: fetch, derive, publish
// =============================================================================
//
// One cycle:
//   1. Fetch index history          (independent)
//   2. Fetch volatility history     (independent)
//   3. Fetch option chain           (independent, own cookie session)
//   4. Sentiment from (3)
//   5. Advisory from (2)
//
// Fetches run one after another; none of them can abort the others.  Every
// failure is logged here and carried into the snapshot.
// =============================================================================

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dashboard::{DashboardSnapshot, PriceSection, Section, SectionError};
use crate::error::{PulseError, PulseResult};
use crate::market_data::{NseOptionChainFetcher, YahooClient};
use crate::runtime_config::RuntimeConfig;
use crate::sentiment::{self, SentimentSummary};
use crate::strategy::{self, Advisory, VixThresholds};
use crate::types::OptionChainSnapshot;

async fn fetch_price_section(
    client: &PulseResult<YahooClient>,
    symbol: &str,
    label: &str,
    metric_label: &str,
    window_days: u32,
) -> PulseResult<PriceSection> {
    let client = client.as_ref().map_err(Clone::clone)?;
    let history = client.get_index_history(symbol, window_days).await?;
    Ok(PriceSection {
        symbol: symbol.to_string(),
        label: label.to_string(),
        metric_label: metric_label.to_string(),
        history,
    })
}

/// Sentiment depends on the chain; a missing chain is reported with its own
/// error kind so the display can say why the metrics are absent.
fn derive_sentiment(chain: &Section<OptionChainSnapshot>) -> Section<SentimentSummary> {
    match chain {
        Section::Ready(snapshot) => sentiment::summarize(&snapshot.rows).into(),
        Section::Failed(e) => Section::Failed(SectionError {
            kind: e.kind,
            message: format!("option chain unavailable: {}", e.message),
        }),
    }
}

fn derive_advisory(vix: &Section<PriceSection>, thresholds: VixThresholds) -> Section<Advisory> {
    match vix {
        Section::Ready(ps) => match ps.last_close() {
            Some(close) => Section::Ready(strategy::advise(close, thresholds)),
            None => Section::Failed(SectionError::from(&PulseError::no_data(
                "volatility history is empty",
            ))),
        },
        Section::Failed(e) => Section::Failed(SectionError {
            kind: e.kind,
            message: format!("volatility index unavailable: {}", e.message),
        }),
    }
}

fn log_section<T>(name: &str, section: &Section<T>) {
    if let Some(e) = section.error() {
        warn!(section = name, kind = %e.kind, error = %e.message, "section failed");
    }
}

/// Run a full refresh cycle against the providers named in `config`.
pub async fn run_cycle(config: &RuntimeConfig) -> DashboardSnapshot {
    let run_id = Uuid::new_v4().to_string();
    info!(run_id = %run_id, "refresh cycle starting");

    let yahoo = YahooClient::from_config(config);

    let index: Section<PriceSection> = fetch_price_section(
        &yahoo,
        &config.index_symbol,
        &config.index_label,
        "Last Close",
        config.window_days,
    )
    .await
    .into();
    log_section("index", &index);

    let vix: Section<PriceSection> = fetch_price_section(
        &yahoo,
        &config.vix_symbol,
        &config.vix_label,
        "Current VIX",
        config.window_days,
    )
    .await
    .into();
    log_section("vix", &vix);

    let option_chain: Section<OptionChainSnapshot> = NseOptionChainFetcher::from_config(config)
        .get_option_chain(&config.option_symbol)
        .await
        .into();
    log_section("option_chain", &option_chain);

    let sentiment = derive_sentiment(&option_chain);
    log_section("sentiment", &sentiment);

    let advisory = derive_advisory(&vix, VixThresholds::from(config));
    log_section("advisory", &advisory);

    let snapshot = DashboardSnapshot {
        run_id,
        generated_at: Utc::now().to_rfc3339(),
        index,
        vix,
        option_chain,
        sentiment,
        advisory,
    };

    info!(
        run_id = %snapshot.run_id,
        failed_sections = snapshot.failures().len(),
        "refresh cycle complete"
    );
    snapshot
}
