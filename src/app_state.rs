// =============================================================================
// Application State: Latest snapshot shared with the REST API
// =============================================================================
//
// Serve mode only.  The refresh loop and the manual refresh endpoint both go
// through `refresh()`, which runs one cycle at a time; the HTTP handlers read
// the published snapshot.  Nothing survives a restart.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the snapshot and error log.
//   - tokio Mutex held across a whole cycle so publishes stay in start order.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::dashboard::DashboardSnapshot;
use crate::error::ErrorKind;
use crate::pipeline;
use crate::runtime_config::RuntimeConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A section failure recorded for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub run_id: String,
    /// Which section failed ("index", "option_chain", ...).
    pub section: String,
    pub kind: ErrorKind,
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// What a finished refresh published.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub run_id: String,
    pub state_version: u64,
    pub failed_sections: Vec<&'static str>,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    /// Incremented every time a snapshot is published.
    pub state_version: AtomicU64,

    pub runtime_config: RuntimeConfig,

    /// Held for the duration of a refresh cycle.
    refresh_lock: tokio::sync::Mutex<()>,

    pub latest: RwLock<Option<DashboardSnapshot>>,

    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Instant when the process was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            state_version: AtomicU64::new(0),
            runtime_config: config,
            refresh_lock: tokio::sync::Mutex::new(()),
            latest: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    /// Run one cycle and publish it.  Concurrent callers queue behind the
    /// cycle already in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;

        let snapshot = pipeline::run_cycle(&self.runtime_config).await;
        let run_id = snapshot.run_id.clone();
        let failed_sections = snapshot.failures().into_iter().map(|(name, _)| name).collect();
        let state_version = self.publish(snapshot);

        info!(run_id = %run_id, state_version, "snapshot published");
        RefreshOutcome {
            run_id,
            state_version,
            failed_sections,
        }
    }

    /// Store a finished cycle, log its failures, and bump the version.
    /// Returns the new version.
    pub fn publish(&self, snapshot: DashboardSnapshot) -> u64 {
        let now = Utc::now().to_rfc3339();
        {
            let mut errors = self.recent_errors.write();
            for (section, err) in snapshot.failures() {
                errors.push(ErrorRecord {
                    run_id: snapshot.run_id.clone(),
                    section: section.to_string(),
                    kind: err.kind,
                    message: err.message.clone(),
                    at: now.clone(),
                });
            }
            let excess = errors.len().saturating_sub(MAX_RECENT_ERRORS);
            if excess > 0 {
                errors.drain(..excess);
            }
        }

        *self.latest.write() = Some(snapshot);
        self.state_version.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest_snapshot(&self) -> Option<DashboardSnapshot> {
        self.latest.read().clone()
    }
}
