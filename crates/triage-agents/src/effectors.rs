//! Device-side effectors: restart, client notification, acknowledgement.
//!
//! The shipped implementation only simulates the effect (fixed delay plus a
//! console record). A real remote-management integration can replace it
//! behind the same trait without touching the dispatcher.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::alert::Alert;
use crate::config::EffectorConfig;
use crate::decision::Decision;
use crate::errors::EffectorError;

/// Carries out the three non-ticket actions.
#[async_trait]
pub trait DeviceEffector: Send + Sync {
    /// Restart the alerting device.
    async fn reboot(&self, alert: &Alert) -> Result<(), EffectorError>;

    /// Tell the client about an issue they need to act on.
    async fn notify_client(&self, alert: &Alert, decision: &Decision) -> Result<(), EffectorError>;

    /// Record that the alert was deliberately left alone.
    async fn acknowledge(&self, alert: &Alert, decision: &Decision) -> Result<(), EffectorError>;
}

/// Effector that only simulates latency and logs what it would have done.
#[derive(Debug, Clone)]
pub struct SimulatedEffector {
    reboot_delay: Duration,
    notify_delay: Duration,
}

impl SimulatedEffector {
    pub fn new(reboot_delay: Duration, notify_delay: Duration) -> Self {
        Self {
            reboot_delay,
            notify_delay,
        }
    }

    pub fn from_config(config: &EffectorConfig) -> Self {
        Self::new(
            Duration::from_millis(config.reboot_delay_ms),
            Duration::from_millis(config.notify_delay_ms),
        )
    }
}

impl Default for SimulatedEffector {
    fn default() -> Self {
        Self::from_config(&EffectorConfig::default())
    }
}

#[async_trait]
impl DeviceEffector for SimulatedEffector {
    async fn reboot(&self, alert: &Alert) -> Result<(), EffectorError> {
        tokio::time::sleep(self.reboot_delay).await;
        info!(
            device = %alert.device_name(),
            reason = %alert.description(),
            command = %format!("Restart-Computer -ComputerName {} -Force", alert.device_name()),
            "REBOOT EXECUTED (simulated)"
        );
        Ok(())
    }

    async fn notify_client(&self, alert: &Alert, decision: &Decision) -> Result<(), EffectorError> {
        tokio::time::sleep(self.notify_delay).await;
        info!(
            device = %alert.device_name(),
            issue = %alert.alert_type(),
            action_required = %decision.reason(),
            to = %format!("client-{}@company.com", alert.device_name().to_lowercase()),
            "CLIENT NOTIFIED (simulated)"
        );
        Ok(())
    }

    async fn acknowledge(&self, alert: &Alert, decision: &Decision) -> Result<(), EffectorError> {
        info!(
            device = %alert.device_name(),
            alert_type = %alert.alert_type(),
            reason = %decision.reason(),
            "ALERT IGNORED"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Action, Confidence};
    use chrono::Utc;

    fn alert() -> Alert {
        Alert::new("A-1", "WS-01", "Pending Reboot", "restart", "High", Utc::now(), "")
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_reboot_waits_configured_delay() {
        let effector = SimulatedEffector::new(Duration::from_secs(1), Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        effector.reboot(&alert()).await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_notify_and_ack_succeed() {
        let effector = SimulatedEffector::default();
        let decision = Decision::new(Action::NotifyClient, "clean up", Confidence::High);
        let start = tokio::time::Instant::now();
        effector.notify_client(&alert(), &decision).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
        effector.acknowledge(&alert(), &decision).await.unwrap();
    }
}
