//! Telemetry Module
//!
//! Aggregate counters about analyses served:
//! - verdicts per risk level, degraded verdicts, rejected requests
//! - signal sources that had to be defaulted
//! - average end-to-end latency
//!
//! Privacy-first: no wallet or contract addresses are recorded.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::{RiskLevel, SignalKind};

/// Aggregated statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TelemetryStats {
    /// Verdicts returned, degraded ones included
    pub total_analyzed: u64,
    pub safe: u64,
    pub caution: u64,
    pub dangerous: u64,
    /// Verdicts produced after an internal fault
    pub degraded: u64,
    /// Requests rejected by validation
    pub rejected: u64,
    /// Defaulted signals by name
    pub signal_failures: BTreeMap<String, u64>,
    pub avg_latency_ms: f64,
    pub period_start: u64,
    pub period_end: u64,
}

impl TelemetryStats {
    /// Plain-text report for the shutdown log
    pub fn summary(&self) -> String {
        let period_mins = self.period_end.saturating_sub(self.period_start) / 60;
        format!(
            r#"
╔══════════════════════════════════════════════════╗
║          🛡️ WALLETWORK - SESSION REPORT           ║
╠══════════════════════════════════════════════════╣
║   📊 Period:              {:>10} min           ║
║   🔍 Analyses:            {:>10}               ║
║   ✅ Safe:                {:>10}               ║
║   🟠 Caution:             {:>10}               ║
║   🔴 Dangerous:           {:>10}               ║
║   ⚠️ Degraded:            {:>10}               ║
║   ⛔ Rejected:            {:>10}               ║
║   ⚡ Avg latency:         {:>10.2}ms             ║
╚══════════════════════════════════════════════════╝
"#,
            period_mins,
            self.total_analyzed,
            self.safe,
            self.caution,
            self.dangerous,
            self.degraded,
            self.rejected,
            self.avg_latency_ms,
        )
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Process-wide collector; shared behind an `Arc`
pub struct TelemetryCollector {
    total_analyzed: AtomicU64,
    safe: AtomicU64,
    caution: AtomicU64,
    dangerous: AtomicU64,
    degraded: AtomicU64,
    rejected: AtomicU64,
    total_latency_ms: AtomicU64,
    signal_failures: RwLock<BTreeMap<SignalKind, u64>>,
    session_start: u64,
    export_dir: PathBuf,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::with_export_dir(PathBuf::from("./telemetry"))
    }

    pub fn with_export_dir(export_dir: PathBuf) -> Self {
        Self {
            total_analyzed: AtomicU64::new(0),
            safe: AtomicU64::new(0),
            caution: AtomicU64::new(0),
            dangerous: AtomicU64::new(0),
            degraded: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            signal_failures: RwLock::new(BTreeMap::new()),
            session_start: current_timestamp(),
            export_dir,
        }
    }

    /// Record one returned verdict
    pub fn record_verdict(
        &self,
        level: RiskLevel,
        degraded: bool,
        unavailable: &[SignalKind],
        latency_ms: u64,
    ) {
        self.total_analyzed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        let counter = match level {
            RiskLevel::Safe => &self.safe,
            RiskLevel::Caution => &self.caution,
            RiskLevel::Dangerous => &self.dangerous,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if degraded {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }

        if !unavailable.is_empty() {
            if let Ok(mut failures) = self.signal_failures.write() {
                for kind in unavailable {
                    *failures.entry(*kind).or_insert(0) += 1;
                }
            }
        }
    }

    /// Record a request rejected before analysis
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> TelemetryStats {
        let total_analyzed = self.total_analyzed.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if total_analyzed > 0 {
            total_latency as f64 / total_analyzed as f64
        } else {
            0.0
        };

        let signal_failures = self
            .signal_failures
            .read()
            .map(|failures| {
                failures
                    .iter()
                    .map(|(k, v)| (k.as_str().to_string(), *v))
                    .collect()
            })
            .unwrap_or_default();

        TelemetryStats {
            total_analyzed,
            safe: self.safe.load(Ordering::Relaxed),
            caution: self.caution.load(Ordering::Relaxed),
            dangerous: self.dangerous.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            signal_failures,
            avg_latency_ms,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }

    /// Write current stats to `stats_<unix>.json` in the export directory
    pub fn export_stats_json(&self) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.export_dir)?;
        let path = self
            .export_dir
            .join(format!("stats_{}.json", current_timestamp()));
        fs::write(&path, self.get_stats().to_json())?;
        Ok(path)
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
