//! Triage error taxonomy with failure-kind classification.
//!
//! Every recoverable failure in the pipeline is represented here. None of
//! them escape a single alert's processing: each kind has a fixed
//! conversion into a value the pipeline can keep working with.
//!
//! | Kind                 | Raised by            | Converted to                        |
//! |----------------------|----------------------|-------------------------------------|
//! | MalformedResponse    | Response validator   | Ignore / Low decision               |
//! | MissingField         | Response validator   | Ignore / Low decision               |
//! | InvalidEnumValue     | Decision constructor | Ignore / Low decision               |
//! | ModelUnavailable     | Model client         | Rule classifier decision            |
//! | EffectorFailure      | Effectors, ticketing | Error-status `ActionOutcome`        |
//! | StorageWriteFailure  | Audit sink           | Logged; stats update skipped        |
//! | UnknownAction        | Action dispatcher    | `unknown_action` / Error outcome    |
//! | Configuration        | Config loader        | Setup failure before any alert runs |

use std::fmt;

use thiserror::Error;

/// Coarse classification of a failure, carried as the `kind` field of
/// failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MalformedResponse,
    MissingField,
    InvalidEnumValue,
    ModelUnavailable,
    EffectorFailure,
    StorageWriteFailure,
    UnknownAction,
    Configuration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedResponse => write!(f, "malformed_response"),
            Self::MissingField => write!(f, "missing_field"),
            Self::InvalidEnumValue => write!(f, "invalid_enum_value"),
            Self::ModelUnavailable => write!(f, "model_unavailable"),
            Self::EffectorFailure => write!(f, "effector_failure"),
            Self::StorageWriteFailure => write!(f, "storage_write_failure"),
            Self::UnknownAction => write!(f, "unknown_action"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Failure to turn a model reply into a `Decision`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No JSON object could be located or decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The JSON object lacks one of `action`, `reason`, `confidence`.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A label is outside its closed set.
    #[error("Invalid {field} value: '{value}'")]
    InvalidEnumValue { field: &'static str, value: String },
}

impl ParseError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::MalformedResponse(_) => FailureKind::MalformedResponse,
            Self::MissingField(_) => FailureKind::MissingField,
            Self::InvalidEnumValue { .. } => FailureKind::InvalidEnumValue,
        }
    }

    /// Operator-facing reason used when this failure is replaced by the
    /// safe default decision.
    pub fn diagnostic(&self) -> String {
        match self {
            Self::MalformedResponse(detail) => {
                format!("Invalid JSON response from model: {detail}")
            }
            Self::MissingField(field) => {
                format!("Invalid response format: missing required field '{field}'")
            }
            Self::InvalidEnumValue { field, value } => {
                format!("Invalid response format: unsupported {field} '{value}'")
            }
        }
    }
}

/// The model endpoint could not produce a reply.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Network, backend or protocol failure.
    #[error("Model unavailable: {0}")]
    Unavailable(String),

    /// The request exceeded the client's deadline.
    #[error("Model request timed out after {0}s")]
    Timeout(u64),
}

impl ModelError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::ModelUnavailable
    }
}

/// The ticketing sink could not be reached at the transport level.
///
/// A reachable sink answering with a non-2xx status is not an error at this
/// layer; the dispatcher inspects the status itself.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticketing transport failure: {0}")]
    Transport(String),

    #[error("Ticket payload could not be encoded: {0}")]
    Encode(String),
}

impl TicketError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::EffectorFailure
    }
}

/// A device-side effector (restart, notification, acknowledgement) failed.
#[derive(Debug, Error)]
#[error("Effector '{effector}' failed: {message}")]
pub struct EffectorError {
    pub effector: &'static str,
    pub message: String,
}

impl EffectorError {
    pub fn new(effector: &'static str, message: impl Into<String>) -> Self {
        Self {
            effector,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        FailureKind::EffectorFailure
    }
}

/// The audit sink rejected a write.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Audit write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("Audit record could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::StorageWriteFailure
    }
}

/// Invalid or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub fn kind(&self) -> FailureKind {
        FailureKind::Configuration
    }
}

/// An alert could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlertError {
    #[error("Alert ID is required")]
    MissingId,

    #[error("Alert device name is required")]
    MissingDevice,

    #[error("Unparseable alert timestamp: '{0}'")]
    InvalidTimestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_failures_are_classified_as_parse_kinds() {
        let errs = [
            (
                ParseError::MalformedResponse("no braces".into()),
                FailureKind::MalformedResponse,
            ),
            (ParseError::MissingField("reason"), FailureKind::MissingField),
            (
                ParseError::InvalidEnumValue {
                    field: "action",
                    value: "shutdown".into(),
                },
                FailureKind::InvalidEnumValue,
            ),
        ];
        for (err, kind) in errs {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }

    #[test]
    fn diagnostics_name_the_failure() {
        let missing = ParseError::MissingField("confidence").diagnostic();
        assert!(missing.contains("missing required field"));
        assert!(missing.contains("confidence"));

        let invalid = ParseError::InvalidEnumValue {
            field: "action",
            value: "format_disk".into(),
        }
        .diagnostic();
        assert!(invalid.contains("format_disk"));

        let malformed = ParseError::MalformedResponse("eof".into()).diagnostic();
        assert!(malformed.starts_with("Invalid JSON response"));
    }

    #[test]
    fn runtime_errors_map_to_their_kinds() {
        assert_eq!(
            ConfigError::Missing("TRIAGE_MODEL_API_KEY".into()).kind(),
            FailureKind::Configuration
        );
        assert_eq!(ModelError::Timeout(30).kind(), FailureKind::ModelUnavailable);
        assert_eq!(
            EffectorError::new("reboot", "denied").kind(),
            FailureKind::EffectorFailure
        );
        assert_eq!(
            TicketError::Transport("refused".into()).kind(),
            FailureKind::EffectorFailure
        );
    }

    #[test]
    fn storage_error_wraps_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: StorageError = io.into();
        assert_eq!(err.kind(), FailureKind::StorageWriteFailure);
        assert!(err.to_string().contains("read-only"));
    }

    #[test]
    fn failure_kind_display_is_snake_case() {
        assert_eq!(FailureKind::UnknownAction.to_string(), "unknown_action");
        assert_eq!(
            FailureKind::StorageWriteFailure.to_string(),
            "storage_write_failure"
        );
    }
}
