// =============================================================================
// Terminal Renderer
// =============================================================================
//
// Lays a DashboardSnapshot out as plain text in the order a reader scans it:
// price history, key metrics, option chain, strategy.  Values come from the
// snapshot's metrics(), series(), table() and advisories() shapes.  All page-level
// settings arrive through RenderContext; nothing here reads globals.
// =============================================================================

use std::fmt::Write;

use crate::dashboard::DashboardSnapshot;
use crate::runtime_config::RuntimeConfig;
use crate::strategy::AdvisoryLevel;

/// Page settings owned by the display layer.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub title: String,
    pub chain_heading: String,
    /// Truncate the option-chain table after this many rows.
    pub max_table_rows: Option<usize>,
}

impl RenderContext {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            title: "Options Trading Market Dashboard".to_string(),
            chain_heading: format!("{} Option Chain", config.index_label),
            max_table_rows: config.max_table_rows,
        }
    }
}

fn heading(out: &mut String, text: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{text}");
    let _ = writeln!(out, "{}", "-".repeat(text.chars().count()));
}

fn render_series(out: &mut String, snapshot: &DashboardSnapshot) {
    let mut series = snapshot.series().into_iter();

    for (fallback_label, section) in [("Index", &snapshot.index), ("Volatility Index", &snapshot.vix)] {
        if let Some(e) = section.error() {
            heading(out, fallback_label);
            let _ = writeln!(out, "ERROR: {fallback_label} load failed: {e}");
            continue;
        }
        let Some(s) = series.next() else { continue };
        heading(out, &s.label);
        for point in &s.points {
            let _ = writeln!(out, "  {}  {:>10.2}", point.date, point.value);
        }
    }
}

fn render_metrics(out: &mut String, snapshot: &DashboardSnapshot) {
    heading(out, "Key Metrics");
    for metric in snapshot.metrics() {
        let _ = writeln!(out, "{}: {:.2}", metric.label, metric.value);
    }
    if let Some(e) = snapshot.sentiment.error() {
        let _ = writeln!(out, "WARNING: Unable to compute PCR or Max Pain: {e}");
    }
}

fn render_chain(out: &mut String, ctx: &RenderContext, snapshot: &DashboardSnapshot) {
    heading(out, &ctx.chain_heading);

    if let Some(e) = snapshot.option_chain.error() {
        let _ = writeln!(out, "ERROR: Option chain load failed: {e}");
        return;
    }

    if let Some(chain) = snapshot.option_chain.ready() {
        if let Some(underlying) = chain.underlying_value {
            let _ = write!(out, "Underlying: {underlying:.2}");
            if let Some(ts) = &chain.exchange_timestamp {
                let _ = write!(out, "  (as of {ts})");
            }
            let _ = writeln!(out);
        }
    }

    let rows = snapshot.table().unwrap_or_default();
    let _ = writeln!(
        out,
        "{:>10} {:>12} {:>12} {:>12} {:>12}",
        "Strike", "CE_OI", "PE_OI", "CE_ChngOI", "PE_ChngOI"
    );

    let limit = ctx.max_table_rows.unwrap_or(usize::MAX);
    for row in rows.iter().take(limit) {
        let _ = writeln!(
            out,
            "{:>10.2} {:>12} {:>12} {:>12} {:>12}",
            row.strike_price, row.ce_oi, row.pe_oi, row.ce_chng_oi, row.pe_chng_oi
        );
    }
    if rows.len() > limit {
        let _ = writeln!(out, "  ... {} more strikes", rows.len() - limit);
    }
}

fn render_advisories(out: &mut String, snapshot: &DashboardSnapshot) {
    heading(out, "Strategy Suggestions");
    for adv in snapshot.advisories() {
        let tag = match adv.level {
            AdvisoryLevel::Warning => "WARNING",
            AdvisoryLevel::Info => "INFO",
        };
        let _ = writeln!(out, "{tag}: {} (VIX {:.2}, {})", adv.message, adv.vix, adv.regime);
    }
    if let Some(e) = snapshot.advisory.error() {
        let _ = writeln!(out, "WARNING: No strategy suggestion: {e}");
    }
}

/// Render the snapshot as a terminal page.
pub fn render_text(snapshot: &DashboardSnapshot, ctx: &RenderContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", ctx.title);
    let _ = writeln!(out, "{}", "=".repeat(ctx.title.chars().count()));
    let _ = writeln!(out, "run {} at {}", snapshot.run_id, snapshot.generated_at);

    render_series(&mut out, snapshot);
    render_metrics(&mut out, snapshot);
    render_chain(&mut out, ctx, snapshot);
    render_advisories(&mut out, snapshot);

    out
}
