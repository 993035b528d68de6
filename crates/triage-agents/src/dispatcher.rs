//! Action dispatcher: runs the effector for a decision and reports the outcome.
//!
//! | Action        | Effector                            | Success            | Failure                                  |
//! |---------------|-------------------------------------|--------------------|------------------------------------------|
//! | Reboot        | `DeviceEffector::reboot`            | `reboot_simulated` | `reboot_failed`                          |
//! | NotifyClient  | `DeviceEffector::notify_client`     | `client_notified`  | `notification_failed`                    |
//! | CreateTicket  | `TicketingClient::post`             | `ticket_created`   | `ticket_failed` / `ticket_network_error` |
//! | Ignore        | `DeviceEffector::acknowledge`       | `alert_ignored`    | `ignore_failed`                          |
//! | unknown label | none                                | n/a                | `unknown_action`                         |
//!
//! `execute` never fails: every effector error becomes an Error-status
//! outcome, and every branch emits one `triage.effect` event.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::alert::Alert;
use crate::decision::{Action, ActionOutcome, Confidence, Decision};
use crate::effectors::DeviceEffector;
use crate::errors::{FailureKind, ParseError, TicketError};
use crate::ticketing::{TicketPayload, TicketingClient};
use crate::validator::reject;

pub const REBOOT_SIMULATED: &str = "reboot_simulated";
pub const REBOOT_FAILED: &str = "reboot_failed";
pub const CLIENT_NOTIFIED: &str = "client_notified";
pub const NOTIFICATION_FAILED: &str = "notification_failed";
pub const TICKET_CREATED: &str = "ticket_created";
pub const TICKET_FAILED: &str = "ticket_failed";
pub const TICKET_NETWORK_ERROR: &str = "ticket_network_error";
pub const ALERT_IGNORED: &str = "alert_ignored";
pub const IGNORE_FAILED: &str = "ignore_failed";
pub const UNKNOWN_ACTION: &str = "unknown_action";

/// Longest slice of a ticketing error body carried into logs.
const MAX_LOGGED_BODY: usize = 200;

pub struct ActionDispatcher {
    ticketing: Arc<dyn TicketingClient>,
    effector: Arc<dyn DeviceEffector>,
}

impl ActionDispatcher {
    pub fn new(ticketing: Arc<dyn TicketingClient>, effector: Arc<dyn DeviceEffector>) -> Self {
        Self {
            ticketing,
            effector,
        }
    }

    /// Execute `decision` for `alert`.
    pub async fn execute(&self, alert: &Alert, decision: &Decision) -> ActionOutcome {
        info!(
            alert_id = %alert.id(),
            action = %decision.action(),
            "Executing action"
        );

        let outcome = match decision.action() {
            Action::Reboot => match self.effector.reboot(alert).await {
                Ok(()) => ActionOutcome::success(REBOOT_SIMULATED),
                Err(e) => {
                    error!(device = %alert.device_name(), kind = %e.kind(), error = %e, "Reboot failed");
                    ActionOutcome::error(REBOOT_FAILED)
                }
            },
            Action::NotifyClient => match self.effector.notify_client(alert, decision).await {
                Ok(()) => ActionOutcome::success(CLIENT_NOTIFIED),
                Err(e) => {
                    error!(device = %alert.device_name(), kind = %e.kind(), error = %e, "Client notification failed");
                    ActionOutcome::error(NOTIFICATION_FAILED)
                }
            },
            Action::CreateTicket => self.create_ticket(alert, decision).await,
            Action::Ignore => match self.effector.acknowledge(alert, decision).await {
                Ok(()) => ActionOutcome::success(ALERT_IGNORED),
                Err(e) => {
                    error!(alert_id = %alert.id(), kind = %e.kind(), error = %e, "Ignore acknowledgement failed");
                    ActionOutcome::error(IGNORE_FAILED)
                }
            },
        };

        emit_effect(alert, decision.action().as_str(), decision.reason(), &outcome);
        outcome
    }

    /// Execute an action given by its wire label (e.g. when replaying an
    /// audit line). Labels outside the closed set yield `unknown_action`; a
    /// blank reason runs the safe Ignore/Low decision instead.
    pub async fn execute_label(
        &self,
        alert: &Alert,
        action_label: &str,
        reason: &str,
        confidence: Confidence,
    ) -> ActionOutcome {
        match Decision::from_labels(action_label, reason, confidence.as_str()) {
            Ok(decision) => self.execute(alert, &decision).await,
            Err(e @ ParseError::MalformedResponse(_)) => {
                warn!(
                    alert_id = %alert.id(),
                    action = %action_label,
                    kind = %e.kind(),
                    error = %e,
                    "Invalid decision labels, substituting safe default"
                );
                self.execute(alert, &reject(&e)).await
            }
            Err(_) => {
                error!(
                    alert_id = %alert.id(),
                    action = %action_label,
                    kind = %FailureKind::UnknownAction,
                    "Unknown action"
                );
                let outcome = ActionOutcome::error(UNKNOWN_ACTION);
                emit_effect(alert, action_label, reason, &outcome);
                outcome
            }
        }
    }

    async fn create_ticket(&self, alert: &Alert, decision: &Decision) -> ActionOutcome {
        let payload = TicketPayload::from_alert(alert, decision);

        match self.ticketing.post(&payload).await {
            Ok(response) if response.is_success() => {
                info!(
                    alert_id = %alert.id(),
                    title = %payload.title,
                    priority = %payload.priority,
                    status = response.status,
                    "TICKET CREATED"
                );
                ActionOutcome::success(TICKET_CREATED)
            }
            Ok(response) => {
                error!(
                    alert_id = %alert.id(),
                    status = response.status,
                    body = %truncate(&response.body, MAX_LOGGED_BODY),
                    "Ticketing sink rejected ticket"
                );
                ActionOutcome::error(TICKET_FAILED)
            }
            Err(TicketError::Transport(message)) => {
                // Still audited as an attempted action.
                warn!(
                    alert_id = %alert.id(),
                    device = %alert.device_name(),
                    error = %truncate(&message, MAX_LOGGED_BODY),
                    "TICKET CREATION ATTEMPTED (network error)"
                );
                ActionOutcome::error(TICKET_NETWORK_ERROR)
            }
            Err(e) => {
                error!(alert_id = %alert.id(), error = %e, "Failed to create ticket");
                ActionOutcome::error(TICKET_FAILED)
            }
        }
    }
}

/// Operator-visible record of what an effector did, independent of the audit write.
fn emit_effect(alert: &Alert, action: &str, reason: &str, outcome: &ActionOutcome) {
    info!(
        target: "triage.effect",
        alert_id = %alert.id(),
        device = %alert.device_name(),
        action = %action,
        reason = %reason,
        action_taken = %outcome.action_taken(),
        status = %outcome.status(),
        "action_effect"
    );
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::decision::ExecutionStatus;
    use crate::errors::EffectorError;
    use crate::ticketing::TicketResponse;

    /// Ticketing fake: scripted reply, records payloads.
    struct FakeTicketing {
        reply: fn() -> Result<TicketResponse, TicketError>,
        posted: Mutex<Vec<TicketPayload>>,
    }

    impl FakeTicketing {
        fn new(reply: fn() -> Result<TicketResponse, TicketError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                posted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TicketingClient for FakeTicketing {
        async fn post(&self, payload: &TicketPayload) -> Result<TicketResponse, TicketError> {
            self.posted.lock().unwrap().push(payload.clone());
            (self.reply)()
        }
    }

    /// Effector fake that succeeds or fails every call.
    struct FakeEffector {
        fail: bool,
    }

    impl FakeEffector {
        fn result(&self, name: &'static str) -> Result<(), EffectorError> {
            if self.fail {
                Err(EffectorError::new(name, "device refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DeviceEffector for FakeEffector {
        async fn reboot(&self, _alert: &Alert) -> Result<(), EffectorError> {
            self.result("reboot")
        }
        async fn notify_client(&self, _: &Alert, _: &Decision) -> Result<(), EffectorError> {
            self.result("notify_client")
        }
        async fn acknowledge(&self, _: &Alert, _: &Decision) -> Result<(), EffectorError> {
            self.result("acknowledge")
        }
    }

    fn created() -> Result<TicketResponse, TicketError> {
        Ok(TicketResponse {
            status: 201,
            body: "{\"id\": 7}".into(),
        })
    }

    fn server_error() -> Result<TicketResponse, TicketError> {
        Ok(TicketResponse {
            status: 500,
            body: "Internal Server Error".into(),
        })
    }

    fn refused() -> Result<TicketResponse, TicketError> {
        Err(TicketError::Transport("connection refused".into()))
    }

    fn dispatcher(
        ticketing: Arc<FakeTicketing>,
        fail_effector: bool,
    ) -> ActionDispatcher {
        ActionDispatcher::new(ticketing, Arc::new(FakeEffector { fail: fail_effector }))
    }

    fn alert() -> Alert {
        Alert::new(
            "ALT-TEST-001",
            "TEST-SERVER-01",
            "Pending Reboot",
            "System requires restart after Windows updates",
            "High",
            Utc::now(),
            "",
        )
        .unwrap()
    }

    fn decision(action: Action) -> Decision {
        Decision::new(action, "test reason", Confidence::High)
    }

    #[tokio::test]
    async fn each_action_reports_success_label() {
        let d = dispatcher(FakeTicketing::new(created), false);
        let expected = [
            (Action::Reboot, REBOOT_SIMULATED),
            (Action::NotifyClient, CLIENT_NOTIFIED),
            (Action::CreateTicket, TICKET_CREATED),
            (Action::Ignore, ALERT_IGNORED),
        ];
        for (action, label) in expected {
            let outcome = d.execute(&alert(), &decision(action)).await;
            assert_eq!(outcome.action_taken(), label);
            assert_eq!(outcome.status(), ExecutionStatus::Success);
        }
    }

    #[tokio::test]
    async fn each_action_reports_failure_label() {
        let d = dispatcher(FakeTicketing::new(server_error), true);
        let expected = [
            (Action::Reboot, REBOOT_FAILED),
            (Action::NotifyClient, NOTIFICATION_FAILED),
            (Action::CreateTicket, TICKET_FAILED),
            (Action::Ignore, IGNORE_FAILED),
        ];
        for (action, label) in expected {
            let outcome = d.execute(&alert(), &decision(action)).await;
            assert_eq!(outcome.action_taken(), label);
            assert_eq!(outcome.status(), ExecutionStatus::Error);
        }
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let d = dispatcher(FakeTicketing::new(refused), false);
        let outcome = d.execute(&alert(), &decision(Action::CreateTicket)).await;
        assert_eq!(outcome, ActionOutcome::error(TICKET_NETWORK_ERROR));
    }

    #[tokio::test]
    async fn encode_failure_is_ticket_failed() {
        fn encode_err() -> Result<TicketResponse, TicketError> {
            Err(TicketError::Encode("bad".into()))
        }
        let d = dispatcher(FakeTicketing::new(encode_err), false);
        let outcome = d.execute(&alert(), &decision(Action::CreateTicket)).await;
        assert_eq!(outcome, ActionOutcome::error(TICKET_FAILED));
    }

    #[tokio::test]
    async fn ticket_payload_carries_alert_and_decision() {
        let ticketing = FakeTicketing::new(created);
        let d = dispatcher(ticketing.clone(), false);
        d.execute(&alert(), &decision(Action::CreateTicket)).await;

        let posted = ticketing.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].title, "Pending Reboot - TEST-SERVER-01");
        assert_eq!(posted[0].device, "TEST-SERVER-01");
        assert_eq!(posted[0].alert_id, "ALT-TEST-001");
        assert_eq!(posted[0].classification_reason, "test reason");
    }

    #[tokio::test]
    async fn non_ticket_actions_never_call_ticketing() {
        let ticketing = FakeTicketing::new(created);
        let d = dispatcher(ticketing.clone(), false);
        for action in [Action::Reboot, Action::NotifyClient, Action::Ignore] {
            d.execute(&alert(), &decision(action)).await;
        }
        assert!(ticketing.posted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_label_yields_unknown_action() {
        let d = dispatcher(FakeTicketing::new(created), false);
        let outcome = d
            .execute_label(&alert(), "format_disk", "test", Confidence::High)
            .await;
        assert_eq!(outcome.action_taken(), UNKNOWN_ACTION);
        assert_eq!(outcome.status(), ExecutionStatus::Error);
    }

    #[tokio::test]
    async fn known_label_dispatches_normally() {
        let d = dispatcher(FakeTicketing::new(created), false);
        let outcome = d
            .execute_label(&alert(), "ignore", "false positive", Confidence::Medium)
            .await;
        assert_eq!(outcome, ActionOutcome::success(ALERT_IGNORED));
    }

    #[tokio::test]
    async fn blank_reason_label_runs_safe_default() {
        let ticketing = FakeTicketing::new(created);
        let d = dispatcher(ticketing.clone(), false);
        let outcome = d
            .execute_label(&alert(), "create_ticket", "  ", Confidence::High)
            .await;
        assert_eq!(outcome, ActionOutcome::success(ALERT_IGNORED));
        assert!(ticketing.posted.lock().unwrap().is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("short", 200), "short");
    }
}
