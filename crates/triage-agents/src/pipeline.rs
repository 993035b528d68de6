//! Triage pipeline: classify → act → audit, one alert at a time.
//!
//! ```text
//! for each alert:
//!   check cancellation (stop before the next alert, never mid-alert)
//!   ├─ engine.classify_with_provenance
//!   ├─ dispatcher.execute
//!   └─ recorder.record_decision   (also on panic, as processing_failed)
//! recorder.write_summary
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::alert::{Alert, AlertSource};
use crate::audit::{AuditRecorder, SessionSummary, PROCESSING_FAILED};
use crate::decision::{ActionOutcome, Decision};
use crate::dispatcher::ActionDispatcher;
use crate::engine::{ClassificationEngine, Provenance};

/// What a session run got through.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Alerts whose processing started.
    pub attempted: usize,
    /// Alerts whose audit record was written.
    pub completed: usize,
    /// The session stopped early on a cancellation request.
    pub cancelled: bool,
    /// Summary line, if it could be written.
    pub summary: Option<SessionSummary>,
}

pub struct TriagePipeline {
    engine: ClassificationEngine,
    dispatcher: ActionDispatcher,
    recorder: AuditRecorder,
    cancel: CancellationToken,
    alert_delay: Duration,
}

impl TriagePipeline {
    pub fn new(
        engine: ClassificationEngine,
        dispatcher: ActionDispatcher,
        recorder: AuditRecorder,
    ) -> Self {
        Self {
            engine,
            dispatcher,
            recorder,
            cancel: CancellationToken::new(),
            alert_delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive alerts (demo pacing).
    pub fn with_alert_delay(mut self, delay: Duration) -> Self {
        self.alert_delay = delay;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// Fetch a batch from `source`, process it and write the summary line.
    ///
    /// Only a failing source is an error; per-alert failures are audited.
    pub async fn run_session(&mut self, source: &dyn AlertSource, limit: usize) -> Result<RunReport> {
        info!(source = source.name(), limit, "Starting triage session");

        let alerts = source
            .fetch_alerts(limit)
            .await
            .with_context(|| format!("Alert source '{}' failed", source.name()))?;

        if alerts.is_empty() {
            info!("No alerts to process");
        }

        let mut report = self.process_alerts(&alerts).await;
        report.summary = self.recorder.write_summary();
        Ok(report)
    }

    /// Process `alerts` in order until done or cancelled.
    pub async fn process_alerts(&mut self, alerts: &[Alert]) -> RunReport {
        let mut report = RunReport {
            attempted: 0,
            completed: 0,
            cancelled: false,
            summary: None,
        };

        for (index, alert) in alerts.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    remaining = alerts.len() - index,
                    "Session cancelled, skipping remaining alerts"
                );
                report.cancelled = true;
                break;
            }

            info!(
                alert_id = %alert.id(),
                device = %alert.device_name(),
                position = index + 1,
                total = alerts.len(),
                "Processing alert"
            );

            report.attempted += 1;
            if self.process_alert(alert).await {
                report.completed += 1;
            }

            let is_last = index + 1 == alerts.len();
            if !is_last && !self.alert_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(self.alert_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        info!(
            attempted = report.attempted,
            completed = report.completed,
            cancelled = report.cancelled,
            "Alert batch finished"
        );
        report
    }

    /// Run one alert end to end. Returns whether its audit record was written.
    async fn process_alert(&mut self, alert: &Alert) -> bool {
        let started = Instant::now();
        let result = AssertUnwindSafe(self.classify_and_act(alert))
            .catch_unwind()
            .await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok((decision, provenance, outcome)) => {
                info!(
                    target: "triage.metrics",
                    alert_id = %alert.id(),
                    action = %decision.action(),
                    confidence = %decision.confidence(),
                    provenance = %provenance,
                    action_taken = %outcome.action_taken(),
                    status = %outcome.status(),
                    elapsed_ms,
                    "alert_processed"
                );
                self.recorder
                    .record_decision(alert, Some(&decision), &outcome, elapsed_ms, None)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(
                    alert_id = %alert.id(),
                    elapsed_ms,
                    error = %message,
                    "Alert processing failed"
                );
                self.recorder.record_decision(
                    alert,
                    None,
                    &ActionOutcome::error(PROCESSING_FAILED),
                    elapsed_ms,
                    Some(&message),
                )
            }
        }
    }

    async fn classify_and_act(&self, alert: &Alert) -> (Decision, Provenance, ActionOutcome) {
        let (decision, provenance) = self.engine.classify_with_provenance(alert).await;
        let outcome = self.dispatcher.execute(alert, &decision).await;
        (decision, provenance, outcome)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
