//! Classification decisions and action outcomes.
//!
//! | Type             | Produced by            | Consumed by                   |
//! |------------------|------------------------|-------------------------------|
//! | `Decision`       | Classification engine  | Action dispatcher, audit      |
//! | `ActionOutcome`  | Action dispatcher      | Audit recorder, pipeline      |
//!
//! Both `Action` and `Confidence` are closed sets; untrusted labels go
//! through [`Decision::from_labels`], which rejects anything outside them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

// ── Action ──────────────────────────────────────────────────────────────────

/// Remediation chosen for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Reboot,
    NotifyClient,
    CreateTicket,
    Ignore,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Reboot,
        Action::NotifyClient,
        Action::CreateTicket,
        Action::Ignore,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::NotifyClient => "notify_client",
            Self::CreateTicket => "create_ticket",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseError::InvalidEnumValue {
                field: "action",
                value: s.to_string(),
            })
    }
}

// ── Confidence ──────────────────────────────────────────────────────────────

/// How much the classifier trusts its own decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Confidence {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High" => Ok(Self::High),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            other => Err(ParseError::InvalidEnumValue {
                field: "confidence",
                value: other.to_string(),
            }),
        }
    }
}

// ── Decision ────────────────────────────────────────────────────────────────

/// The validated output of classification.
///
/// Serializes to the `ai_classification` object of the audit log:
/// `{"action": "reboot", "reason": "...", "confidence": "High"}`.
///
/// Decoding goes through [`Decision::from_labels`], so a stored decision with
/// a blank reason or an out-of-set label is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DecisionLabels")]
pub struct Decision {
    action: Action,
    reason: String,
    confidence: Confidence,
}

/// Wire shape of a decision before validation.
#[derive(Deserialize)]
struct DecisionLabels {
    action: String,
    reason: String,
    confidence: String,
}

impl TryFrom<DecisionLabels> for Decision {
    type Error = ParseError;

    fn try_from(labels: DecisionLabels) -> Result<Self, Self::Error> {
        Decision::from_labels(&labels.action, &labels.reason, &labels.confidence)
    }
}

impl Decision {
    /// Build a decision from already-typed parts. `reason` must not be blank;
    /// untrusted input goes through [`Decision::from_labels`].
    pub fn new(action: Action, reason: impl Into<String>, confidence: Confidence) -> Self {
        let reason = reason.into();
        debug_assert!(!reason.trim().is_empty(), "decision reason must not be blank");
        Self {
            action,
            reason,
            confidence,
        }
    }

    /// Build a decision from untrusted labels.
    pub fn from_labels(action: &str, reason: &str, confidence: &str) -> Result<Self, ParseError> {
        let action = action.parse::<Action>()?;
        let confidence = confidence.parse::<Confidence>()?;
        if reason.trim().is_empty() {
            return Err(ParseError::MalformedResponse("reason is empty".into()));
        }
        Ok(Self::new(action, reason, confidence))
    }

    /// The fail-safe decision: never destructive, never client-facing.
    pub fn safe_default(reason: impl Into<String>) -> Self {
        Self::new(Action::Ignore, reason, Confidence::Low)
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }
}

// ── ActionOutcome ───────────────────────────────────────────────────────────

/// Whether an effector concluded cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which effector ran and how it concluded (e.g. `ticket_created`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    action_taken: String,
    status: ExecutionStatus,
}

impl ActionOutcome {
    pub fn success(action_taken: impl Into<String>) -> Self {
        Self {
            action_taken: action_taken.into(),
            status: ExecutionStatus::Success,
        }
    }

    pub fn error(action_taken: impl Into<String>) -> Self {
        Self {
            action_taken: action_taken.into(),
            status: ExecutionStatus::Error,
        }
    }

    pub fn action_taken(&self) -> &str {
        &self.action_taken
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}
