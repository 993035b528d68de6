//! Alert value type and the alert-source capability.
//!
//! Alerts are built once by an [`AlertSource`] and never mutated. Severity
//! labels outside the known set collapse to `Medium` at construction so the
//! rest of the pipeline only ever sees the closed set.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::AlertError;

/// Alert severity as reported by the monitoring dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Normalize a dashboard label. Unknown labels become `Medium`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Critical" => Self::Critical,
            "High" => Self::High,
            "Medium" => Self::Medium,
            "Low" => Self::Low,
            "Info" => Self::Info,
            _ => Self::Medium,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::Info => "Info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raised condition from a monitored device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AlertRecord")]
pub struct Alert {
    id: String,
    device_name: String,
    alert_type: String,
    description: String,
    severity: Severity,
    timestamp: DateTime<Utc>,
    raw_text: String,
}

impl Alert {
    /// Build an alert, rejecting empty identifiers.
    pub fn new(
        id: impl Into<String>,
        device_name: impl Into<String>,
        alert_type: impl Into<String>,
        description: impl Into<String>,
        severity: &str,
        timestamp: DateTime<Utc>,
        raw_text: impl Into<String>,
    ) -> Result<Self, AlertError> {
        let id = id.into();
        let device_name = device_name.into();
        if id.trim().is_empty() {
            return Err(AlertError::MissingId);
        }
        if device_name.trim().is_empty() {
            return Err(AlertError::MissingDevice);
        }
        Ok(Self {
            id,
            device_name,
            alert_type: alert_type.into(),
            description: description.into(),
            severity: Severity::from_label(severity),
            timestamp,
            raw_text: raw_text.into(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn alert_type(&self) -> &str {
        &self.alert_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

/// Wire shape of an alert as stored in alert files.
#[derive(Debug, Deserialize)]
struct AlertRecord {
    id: String,
    device_name: String,
    alert_type: String,
    description: String,
    severity: String,
    timestamp: String,
    #[serde(default)]
    raw_text: String,
}

impl TryFrom<AlertRecord> for Alert {
    type Error = AlertError;

    fn try_from(record: AlertRecord) -> Result<Self, Self::Error> {
        let timestamp = parse_timestamp(&record.timestamp)?;
        Alert::new(
            record.id,
            record.device_name,
            record.alert_type,
            record.description,
            &record.severity,
            timestamp,
            record.raw_text,
        )
    }
}

/// Naive layouts tried after RFC 3339; both are read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Accept RFC 3339 (including a trailing `Z`) or a naive ISO-8601 timestamp
/// with either a `T` or a space separator.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AlertError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AlertError::InvalidTimestamp(raw.to_string()))
}

// ── Alert source capability ─────────────────────────────────────────────────

/// Produces the finite, ordered batch of alerts for one session.
///
/// An empty batch is valid; the pipeline then has nothing to do.
#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Fetch at most `limit` alerts, in arrival order.
    async fn fetch_alerts(&self, limit: usize) -> Result<Vec<Alert>>;
}

/// Reads alerts from a JSON array on disk (demo data, exported dashboards).
pub struct JsonFileAlertSource {
    path: PathBuf,
}

impl JsonFileAlertSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AlertSource for JsonFileAlertSource {
    fn name(&self) -> &str {
        "json_file"
    }

    async fn fetch_alerts(&self, limit: usize) -> Result<Vec<Alert>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read alert file {}", self.path.display()))?;

        let mut alerts: Vec<Alert> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse alert file {}", self.path.display()))?;

        // Ids are unique within a session; the first occurrence wins.
        let mut seen = HashSet::new();
        alerts.retain(|alert| {
            let first = seen.insert(alert.id().to_string());
            if !first {
                warn!(
                    alert_id = %alert.id(),
                    device = %alert.device_name(),
                    "Dropping alert with duplicate id"
                );
            }
            first
        });

        if alerts.len() > limit {
            debug!(total = alerts.len(), limit, "Truncating alert batch");
            alerts.truncate(limit);
        }

        info!(
            path = %self.path.display(),
            count = alerts.len(),
            "Loaded alerts from file"
        );
        Ok(alerts)
    }
}
