//! Prompt template for model-backed classification.
//!
//! Prompt versioning: bump `PROMPT_VERSION` whenever the template changes so
//! a logged decision can be traced back to the wording that produced it.

use crate::alert::Alert;

/// Prompt version. Bump on any template change.
pub const PROMPT_VERSION: &str = "1.0.0";

/// Classification prompt. Placeholders are replaced verbatim by
/// [`render_classification_prompt`].
pub const CLASSIFICATION_TEMPLATE: &str = "\
You are an expert managed-services technician analyzing monitoring alerts. \
Classify this alert and determine the appropriate action.

Alert Details:
Device: {device_name}
Type: {alert_type}
Description: {description}
Severity: {severity}
Raw Text: {raw_text}

Classification Rules:
1. REBOOT: For pending reboots, Windows updates requiring restart, or system restart alerts
2. NOTIFY_CLIENT: For issues requiring client action (user behavior, hardware replacement, etc.)
3. CREATE_TICKET: For complex technical issues requiring technician investigation
4. IGNORE: For false positives, informational alerts, or resolved issues

Respond with ONLY valid JSON in this exact format:
{
    \"action\": \"reboot|notify_client|create_ticket|ignore\",
    \"reason\": \"Brief explanation of why this action was chosen\",
    \"confidence\": \"High|Medium|Low\"
}
";

/// Interpolate alert fields into the classification template.
///
/// Substitution is single-pass over the template, so braces or placeholder
/// names inside alert text are left untouched.
pub fn render_classification_prompt(alert: &Alert) -> String {
    let severity = alert.severity();
    let fields: [(&str, &str); 5] = [
        ("{device_name}", alert.device_name()),
        ("{alert_type}", alert.alert_type()),
        ("{description}", alert.description()),
        ("{severity}", severity.as_str()),
        ("{raw_text}", alert.raw_text()),
    ];

    let mut out = String::with_capacity(CLASSIFICATION_TEMPLATE.len() + 256);
    let mut rest = CLASSIFICATION_TEMPLATE;
    'scan: while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        for (placeholder, value) in fields {
            if tail.starts_with(placeholder) {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
                continue 'scan;
            }
        }
        out.push('{');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}
