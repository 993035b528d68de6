//! Ticketing client capability and the ticket payload contract.
//!
//! The payload field names are consumed by the external ticketing sink and
//! must not change.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::alert::{Alert, Severity};
use crate::config::TicketingConfig;
use crate::decision::Decision;
use crate::errors::TicketError;

/// Constant `source` tag identifying tickets raised by this service.
pub const TICKET_SOURCE: &str = "alert-triage";

const USER_AGENT: &str = concat!("alert-triage/", env!("CARGO_PKG_VERSION"));

/// Ticket priority understood by the ticketing sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketPriority {
    High,
    Medium,
    Low,
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
        }
    }
}

impl From<Severity> for TicketPriority {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::High => Self::High,
            Severity::Medium => Self::Medium,
            Severity::Low | Severity::Info => Self::Low,
        }
    }
}

/// JSON body posted to the ticketing webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPayload {
    pub title: String,
    pub description: String,
    pub priority: TicketPriority,
    pub device: String,
    pub alert_id: String,
    pub classification_reason: String,
    pub confidence: String,
    /// Alert timestamp, ISO-8601.
    pub timestamp: String,
    pub source: String,
}

impl TicketPayload {
    pub fn from_alert(alert: &Alert, decision: &Decision) -> Self {
        Self {
            title: format!("{} - {}", alert.alert_type(), alert.device_name()),
            description: alert.description().to_string(),
            priority: alert.severity().into(),
            device: alert.device_name().to_string(),
            alert_id: alert.id().to_string(),
            classification_reason: decision.reason().to_string(),
            confidence: decision.confidence().to_string(),
            timestamp: alert.timestamp().to_rfc3339(),
            source: TICKET_SOURCE.to_string(),
        }
    }
}

/// Status and body returned by a reachable ticketing sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketResponse {
    pub status: u16,
    pub body: String,
}

impl TicketResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Posts ticket payloads to the ticketing sink.
///
/// A non-2xx answer is returned as `Ok`; `Err` is reserved for transport
/// failures (refused connection, timeout, DNS).
#[async_trait]
pub trait TicketingClient: Send + Sync {
    async fn post(&self, payload: &TicketPayload) -> Result<TicketResponse, TicketError>;
}

/// Ticketing client for a JSON webhook endpoint.
pub struct WebhookTicketingClient {
    url: String,
    http: reqwest::Client,
}

impl WebhookTicketingClient {
    pub fn new(config: &TicketingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build ticketing HTTP client")?;
        Ok(Self {
            url: config.webhook_url.clone(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TicketingClient for WebhookTicketingClient {
    async fn post(&self, payload: &TicketPayload) -> Result<TicketResponse, TicketError> {
        debug!(url = %self.url, alert_id = %payload.alert_id, "Posting ticket");

        let response = self
            .http
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| TicketError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok(TicketResponse { status, body })
    }
}
