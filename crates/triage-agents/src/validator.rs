//! Model reply validation.
//!
//! The model is asked for a bare JSON object but routinely wraps it in
//! prose or code fences. Validation flow:
//! 1. Slice from the first `{` to the last `}`
//! 2. Decode the slice as a JSON object
//! 3. Require `action`, `reason`, `confidence`
//! 4. Build the `Decision`, rejecting labels outside the closed sets
//!
//! The classification engine owns the substitution: on any failure it logs
//! the error and stands [`reject`] in for the reply.

use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::errors::ParseError;

/// Fields every model reply must carry, checked in this order.
pub const REQUIRED_FIELDS: [&str; 3] = ["action", "reason", "confidence"];

/// Parse a model reply into a validated decision.
pub fn parse(raw: &str) -> Result<Decision, ParseError> {
    let block = extract_json_block(raw)
        .ok_or_else(|| ParseError::MalformedResponse("no JSON object found in response".into()))?;

    let value: Value = serde_json::from_str(block)
        .map_err(|e| ParseError::MalformedResponse(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(ParseError::MalformedResponse(
            "response JSON is not an object".into(),
        ));
    };

    for field in REQUIRED_FIELDS {
        if !fields.contains_key(field) {
            return Err(ParseError::MissingField(field));
        }
    }

    let action = label_field(&fields, "action")?;
    let confidence = label_field(&fields, "confidence")?;
    let reason = match &fields["reason"] {
        Value::String(s) => s.as_str(),
        _ => {
            return Err(ParseError::MalformedResponse(
                "field 'reason' is not a string".into(),
            ))
        }
    };

    Decision::from_labels(action, reason, confidence)
}

/// The safe Ignore/Low decision standing in for a rejected reply.
pub fn reject(err: &ParseError) -> Decision {
    Decision::safe_default(err.diagnostic())
}

/// A label field must be a string; anything else cannot be in its closed set.
fn label_field<'a>(fields: &'a Map<String, Value>, name: &'static str) -> Result<&'a str, ParseError> {
    match &fields[name] {
        Value::String(s) => Ok(s.as_str()),
        other => Err(ParseError::InvalidEnumValue {
            field: name,
            value: other.to_string(),
        }),
    }
}

/// First `{` to last `}`, inclusive.
fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        Some(&text[start..=end])
    } else {
        None
    }
}
