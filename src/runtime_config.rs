// =============================================================================
// Runtime Configuration: Provider endpoints, symbols and display settings
// =============================================================================
//
// Every tunable lives here: which tickers to pull, where the providers live,
// how long each request may block, and the VIX thresholds behind the strategy
// text.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_index_symbol() -> String {
    "^NSEI".to_string()
}

fn default_index_label() -> String {
    "Nifty 50".to_string()
}

fn default_vix_symbol() -> String {
    "^INDIAVIX".to_string()
}

fn default_vix_label() -> String {
    "India VIX".to_string()
}

fn default_option_symbol() -> String {
    "NIFTY".to_string()
}

fn default_window_days() -> u32 {
    5
}

fn default_yahoo_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_nse_base_url() -> String {
    "https://www.nseindia.com".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_vix_high_threshold() -> f64 {
    18.0
}

fn default_vix_low_threshold() -> f64 {
    13.0
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    60
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for a Nifty Pulse process.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Instruments --------------------------------------------------------

    /// Equity index ticker on the market-data provider.
    #[serde(default = "default_index_symbol")]
    pub index_symbol: String,

    #[serde(default = "default_index_label")]
    pub index_label: String,

    /// Volatility index ticker on the market-data provider.
    #[serde(default = "default_vix_symbol")]
    pub vix_symbol: String,

    #[serde(default = "default_vix_label")]
    pub vix_label: String,

    /// Underlying symbol for the exchange option-chain API.
    #[serde(default = "default_option_symbol")]
    pub option_symbol: String,

    /// Trailing window of trading days for price history.
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    // --- Providers ------------------------------------------------------------

    #[serde(default = "default_yahoo_base_url")]
    pub yahoo_base_url: String,

    /// Exchange web root. The warm-up request hits this URL verbatim and the
    /// Referer header is this URL plus a trailing slash.
    #[serde(default = "default_nse_base_url")]
    pub nse_base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on every outbound HTTP request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Strategy text --------------------------------------------------------

    /// VIX strictly above this is "high volatility".
    #[serde(default = "default_vix_high_threshold")]
    pub vix_high_threshold: f64,

    /// VIX strictly below this is "low volatility".
    #[serde(default = "default_vix_low_threshold")]
    pub vix_low_threshold: f64,

    // --- Display --------------------------------------------------------------

    /// Truncate the terminal option-chain table to this many rows.
    #[serde(default)]
    pub max_table_rows: Option<usize>,

    // --- Serve mode -----------------------------------------------------------

    /// Run the REST API and a refresh loop instead of a single pass.
    #[serde(default)]
    pub serve: bool,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            index_symbol: default_index_symbol(),
            index_label: default_index_label(),
            vix_symbol: default_vix_symbol(),
            vix_label: default_vix_label(),
            option_symbol: default_option_symbol(),
            window_days: default_window_days(),
            yahoo_base_url: default_yahoo_base_url(),
            nse_base_url: default_nse_base_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            vix_high_threshold: default_vix_high_threshold(),
            vix_low_threshold: default_vix_low_threshold(),
            max_table_rows: None,
            serve: false,
            bind_addr: default_bind_addr(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            index = %config.index_symbol,
            option_symbol = %config.option_symbol,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Apply `PULSE_*` overrides from a variable lookup.
    ///
    /// `main` passes `std::env::var`; tests pass a closure over a fixed map.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        if let Some(v) = get("PULSE_SERVE") {
            self.serve = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on");
        }
        if let Some(v) = get("PULSE_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(secs) = get("PULSE_REFRESH_SECS").and_then(|v| v.parse().ok()) {
            self.refresh_interval_secs = secs;
        }
        if let Some(v) = get("PULSE_INDEX_SYMBOL") {
            self.index_symbol = v;
        }
        if let Some(v) = get("PULSE_VIX_SYMBOL") {
            self.vix_symbol = v;
        }
        if let Some(v) = get("PULSE_OPTION_SYMBOL") {
            self.option_symbol = v.to_uppercase();
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.index_symbol, "^NSEI");
        assert_eq!(cfg.vix_symbol, "^INDIAVIX");
        assert_eq!(cfg.option_symbol, "NIFTY");
        assert_eq!(cfg.window_days, 5);
        assert_eq!(cfg.nse_base_url, "https://www.nseindia.com");
        assert_eq!(cfg.user_agent, "Mozilla/5.0");
        assert!(!cfg.serve);
        assert!((cfg.vix_high_threshold - 18.0).abs() < f64::EPSILON);
        assert!((cfg.vix_low_threshold - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.index_label, "Nifty 50");
        assert_eq!(cfg.refresh_interval_secs, 60);
        assert_eq!(cfg.request_timeout_secs, 10);
        assert!(cfg.max_table_rows.is_none());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "option_symbol": "BANKNIFTY", "window_days": 10 }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.option_symbol, "BANKNIFTY");
        assert_eq!(cfg.window_days, 10);
        assert_eq!(cfg.vix_symbol, "^INDIAVIX");
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let dir = std::env::temp_dir().join(format!("nifty-pulse-cfg-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pulse_config.json");

        let mut cfg = RuntimeConfig::default();
        cfg.window_days = 7;
        cfg.max_table_rows = Some(20);
        cfg.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded.window_days, 7);
        assert_eq!(loaded.max_table_rows, Some(20));
        assert!(!path.with_extension("json.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_missing_file_is_error() {
        let path = std::env::temp_dir().join("nifty-pulse-definitely-missing.json");
        assert!(RuntimeConfig::load(path).is_err());
    }

    #[test]
    fn overrides_apply_and_ignore_blank_values() {
        let vars: HashMap<&str, &str> = [
            ("PULSE_SERVE", "true"),
            ("PULSE_BIND_ADDR", "127.0.0.1:9000"),
            ("PULSE_REFRESH_SECS", "not-a-number"),
            ("PULSE_OPTION_SYMBOL", "banknifty"),
            ("PULSE_INDEX_SYMBOL", "   "),
        ]
        .into_iter()
        .collect();

        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert!(cfg.serve);
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.refresh_interval_secs, 60);
        assert_eq!(cfg.option_symbol, "BANKNIFTY");
        assert_eq!(cfg.index_symbol, "^NSEI");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let mut cfg = RuntimeConfig::default();
        cfg.request_timeout_secs = 0;
        assert_eq!(cfg.request_timeout(), Duration::from_secs(1));
    }
}
