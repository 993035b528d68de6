//! Audit trail and session statistics.
//!
//! Every processed alert produces one JSON line; the session ends with one
//! summary line. Line kinds are told apart by their keys:
//! `ai_classification` marks a decision line, `session_duration_seconds`
//! a summary line.
//!
//! Statistics only move after the corresponding line reached the sink, so
//! the summary never counts an alert the trail does not show.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::alert::Alert;
use crate::decision::{ActionOutcome, Decision, ExecutionStatus};
use crate::errors::StorageError;

/// Breakdown bucket for alerts that never reached a decision.
pub const PROCESSING_FAILED: &str = "processing_failed";

/// Manual handling time per alert, seconds.
pub const MANUAL_SECONDS_PER_ALERT: u64 = 180;
/// Automated handling time per alert, seconds.
pub const AUTOMATED_SECONDS_PER_ALERT: u64 = 5;

// ── Sinks ───────────────────────────────────────────────────────────────────

/// Durable, append-only line storage.
pub trait AuditSink: Send + Sync {
    fn append_line(&self, line: &str) -> Result<(), StorageError>;
}

/// Appends lines to a JSON Lines file, creating it on first write.
#[derive(Debug, Clone)]
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlFileSink {
    fn append_line(&self, line: &str) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}

/// In-memory sink, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl AuditSink for MemorySink {
    fn append_line(&self, line: &str) -> Result<(), StorageError> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line.to_string());
        Ok(())
    }
}

// ── Records ─────────────────────────────────────────────────────────────────

/// One audit line per processed alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub timestamp: String,
    pub alert_id: String,
    pub device_name: String,
    pub alert_type: String,
    /// `null` when the alert failed before classification finished.
    pub ai_classification: Option<Decision>,
    pub action_taken: String,
    pub execution_status: ExecutionStatus,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Estimated operator time saved by automation. Presentation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSavings {
    pub per_alert_seconds: u64,
    pub total_saved_seconds: u64,
    pub total_saved_minutes: f64,
    pub daily_projection_minutes: f64,
}

impl TimeSavings {
    pub fn for_processed(processed: u64) -> Self {
        let per_alert_seconds = MANUAL_SECONDS_PER_ALERT - AUTOMATED_SECONDS_PER_ALERT;
        let total_saved_seconds = processed * per_alert_seconds;
        let exact_minutes = total_saved_seconds as f64 / 60.0;
        let daily_projection_minutes = if processed == 0 {
            0.0
        } else {
            round_to(exact_minutes * processed as f64 / 10.0, 1)
        };
        Self {
            per_alert_seconds,
            total_saved_seconds,
            total_saved_minutes: round_to(exact_minutes, 1),
            daily_projection_minutes,
        }
    }
}

/// Session totals, as written to the summary line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_duration_seconds: f64,
    pub total_alerts_processed: u64,
    pub actions_breakdown: BTreeMap<String, u64>,
    pub errors_encountered: u64,
    pub time_savings: TimeSavings,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    timestamp: String,
    session_type: &'static str,
    #[serde(flatten)]
    summary: &'a SessionSummary,
}

// ── Stats ───────────────────────────────────────────────────────────────────

/// Running statistics for one session.
#[derive(Debug, Clone)]
pub struct SessionStats {
    started_at: DateTime<Utc>,
    started: Instant,
    processed: u64,
    actions: BTreeMap<String, u64>,
    errors: u64,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            started: Instant::now(),
            processed: 0,
            actions: BTreeMap::new(),
            errors: 0,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Count for an action bucket (`reboot`, ..., `processing_failed`).
    pub fn action_count(&self, bucket: &str) -> u64 {
        self.actions.get(bucket).copied().unwrap_or(0)
    }

    pub fn actions(&self) -> &BTreeMap<String, u64> {
        &self.actions
    }
}

// ── Recorder ────────────────────────────────────────────────────────────────

/// Appends audit lines and owns the session statistics.
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    stats: SessionStats,
}

impl AuditRecorder {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            stats: SessionStats::new(),
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Append a decision line; on success fold it into the stats.
    ///
    /// Returns whether the line was written. Write failures are logged and
    /// otherwise ignored.
    pub fn record_decision(
        &mut self,
        alert: &Alert,
        decision: Option<&Decision>,
        outcome: &ActionOutcome,
        elapsed_ms: u64,
        error_message: Option<&str>,
    ) -> bool {
        let record = DecisionRecord {
            timestamp: Utc::now().to_rfc3339(),
            alert_id: alert.id().to_string(),
            device_name: alert.device_name().to_string(),
            alert_type: alert.alert_type().to_string(),
            ai_classification: decision.cloned(),
            action_taken: outcome.action_taken().to_string(),
            execution_status: outcome.status(),
            processing_time_ms: elapsed_ms,
            error_message: error_message.map(str::to_string),
        };

        if let Err(e) = self.append(&record) {
            error!(
                alert_id = %alert.id(),
                kind = %e.kind(),
                error = %e,
                "Failed to write audit record"
            );
            return false;
        }

        let bucket = decision
            .map(|d| d.action().as_str())
            .unwrap_or(PROCESSING_FAILED);
        self.stats.processed += 1;
        *self.stats.actions.entry(bucket.to_string()).or_insert(0) += 1;
        if outcome.status() == ExecutionStatus::Error {
            self.stats.errors += 1;
        }

        debug!(
            alert_id = %alert.id(),
            bucket,
            processed = self.stats.processed,
            "Audit record written"
        );
        true
    }

    /// Current session totals. Does not write anything.
    pub fn summarize(&self) -> SessionSummary {
        SessionSummary {
            session_duration_seconds: round_to(self.stats.started.elapsed().as_secs_f64(), 2),
            total_alerts_processed: self.stats.processed,
            actions_breakdown: self.stats.actions.clone(),
            errors_encountered: self.stats.errors,
            time_savings: TimeSavings::for_processed(self.stats.processed),
        }
    }

    /// Append the summary line. `None` when the write failed.
    pub fn write_summary(&self) -> Option<SessionSummary> {
        let summary = self.summarize();
        let line = SummaryLine {
            timestamp: Utc::now().to_rfc3339(),
            session_type: "summary",
            summary: &summary,
        };

        match self.append(&line) {
            Ok(()) => {
                info!(
                    processed = summary.total_alerts_processed,
                    errors = summary.errors_encountered,
                    duration_secs = summary.session_duration_seconds,
                    "Session summary written"
                );
                Some(summary)
            }
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "Failed to write session summary");
                None
            }
        }
    }

    fn append<T: Serialize>(&self, value: &T) -> Result<(), StorageError> {
        let line = serde_json::to_string(value)?;
        self.sink.append_line(&line)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
