//! `triage.effect` events: one per dispatched action, emitted whether or not
//! the audit write that follows succeeds.
//!
//! A capturing `tracing_subscriber` layer is installed as the thread-local
//! default for each test, so the tests stay on the current-thread runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use triage_agents::config::EffectorConfig;
use triage_agents::dispatcher::{REBOOT_SIMULATED, TICKET_CREATED, UNKNOWN_ACTION};
use triage_agents::errors::{StorageError, TicketError};
use triage_agents::ticketing::{TicketPayload, TicketResponse};
use triage_agents::{
    ActionDispatcher, Alert, AuditRecorder, AuditSink, ClassificationEngine, Confidence,
    SimulatedEffector, TicketingClient, TriagePipeline,
};

type Fields = BTreeMap<String, String>;

/// Keeps the fields of every `triage.effect` event.
#[derive(Clone, Default)]
struct EffectCapture {
    events: Arc<Mutex<Vec<Fields>>>,
}

impl EffectCapture {
    fn events(&self) -> Vec<Fields> {
        self.events.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for EffectCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != "triage.effect" {
            return;
        }
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(visitor.0);
    }
}

#[derive(Default)]
struct FieldVisitor(Fields);

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

/// Sink whose every write fails.
struct FailingSink;

impl AuditSink for FailingSink {
    fn append_line(&self, _line: &str) -> Result<(), StorageError> {
        Err(StorageError::Write(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only volume",
        )))
    }
}

struct AcceptingTicketing;

#[async_trait]
impl TicketingClient for AcceptingTicketing {
    async fn post(&self, _payload: &TicketPayload) -> Result<TicketResponse, TicketError> {
        Ok(TicketResponse {
            status: 201,
            body: "{}".into(),
        })
    }
}

fn dispatcher() -> ActionDispatcher {
    ActionDispatcher::new(
        Arc::new(AcceptingTicketing),
        Arc::new(SimulatedEffector::from_config(&EffectorConfig {
            reboot_delay_ms: 0,
            notify_delay_ms: 0,
        })),
    )
}

fn alert(id: &str, device: &str, alert_type: &str, description: &str) -> Alert {
    Alert::new(id, device, alert_type, description, "High", Utc::now(), "").unwrap()
}

#[tokio::test]
async fn effect_event_per_action_even_when_audit_write_fails() {
    let capture = EffectCapture::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let mut pipeline = TriagePipeline::new(
        ClassificationEngine::rules_only(),
        dispatcher(),
        AuditRecorder::new(Arc::new(FailingSink)),
    );
    let alerts = [
        alert("ALT-1", "SERVER-01", "Pending Reboot", "restart required"),
        alert("ALT-2", "PRINTER-03", "Printer Offline", "device unreachable"),
    ];
    let report = pipeline.process_alerts(&alerts).await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.completed, 0);
    assert_eq!(pipeline.recorder().stats().processed(), 0);

    let events = capture.events();
    assert_eq!(events.len(), 2);

    assert_eq!(events[0]["alert_id"], "ALT-1");
    assert_eq!(events[0]["device"], "SERVER-01");
    assert_eq!(events[0]["action"], "reboot");
    assert_eq!(
        events[0]["reason"],
        "System requires restart to complete pending updates"
    );
    assert_eq!(events[0]["action_taken"], REBOOT_SIMULATED);
    assert_eq!(events[0]["status"], "success");

    assert_eq!(events[1]["device"], "PRINTER-03");
    assert_eq!(events[1]["action"], "create_ticket");
    assert_eq!(events[1]["action_taken"], TICKET_CREATED);
}

#[tokio::test]
async fn effect_event_for_each_label_execution() {
    let capture = EffectCapture::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));

    let d = dispatcher();
    let a = alert("ALT-9", "WS-042", "Mystery", "something odd");

    let unknown = d
        .execute_label(&a, "format_disk", "operator replay", Confidence::High)
        .await;
    assert_eq!(unknown.action_taken(), UNKNOWN_ACTION);

    d.execute_label(&a, "ignore", "false positive", Confidence::Low)
        .await;

    let events = capture.events();
    assert_eq!(events.len(), 2);

    assert_eq!(events[0]["device"], "WS-042");
    assert_eq!(events[0]["action"], "format_disk");
    assert_eq!(events[0]["reason"], "operator replay");
    assert_eq!(events[0]["action_taken"], UNKNOWN_ACTION);
    assert_eq!(events[0]["status"], "error");

    assert_eq!(events[1]["action"], "ignore");
    assert_eq!(events[1]["reason"], "false positive");
    assert_eq!(events[1]["action_taken"], "alert_ignored");
}
