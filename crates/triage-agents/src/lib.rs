//! Alert triage: decide a remediation for each infrastructure alert, carry
//! it out, and keep an audit trail.
//!
//! Components, leaves first:
//!
//! - [`validator`]: model reply → `Decision` (or the safe default)
//! - [`rules`]: deterministic keyword classifier
//! - [`engine`]: model first, rules as fallback
//! - [`dispatcher`]: `Decision` → effector → `ActionOutcome`
//! - [`audit`]: JSON Lines trail plus session statistics
//! - [`pipeline`]: sequences the above per alert

pub mod alert;
pub mod audit;
pub mod config;
pub mod decision;
pub mod dispatcher;
pub mod effectors;
pub mod engine;
pub mod errors;
pub mod model_client;
pub mod pipeline;
pub mod prompts;
pub mod rules;
pub mod ticketing;
pub mod validator;

pub use alert::{Alert, AlertSource, JsonFileAlertSource, Severity};
pub use audit::{AuditRecorder, AuditSink, JsonlFileSink, MemorySink, SessionSummary};
pub use config::TriageConfig;
pub use decision::{Action, ActionOutcome, Confidence, Decision, ExecutionStatus};
pub use dispatcher::ActionDispatcher;
pub use effectors::{DeviceEffector, SimulatedEffector};
pub use engine::{ClassificationEngine, Provenance};
pub use errors::FailureKind;
pub use model_client::{ModelClient, RigModelClient};
pub use pipeline::{RunReport, TriagePipeline};
pub use ticketing::{TicketingClient, WebhookTicketingClient};
