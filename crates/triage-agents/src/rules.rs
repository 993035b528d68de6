//! Deterministic keyword classifier used when the model path is unavailable.
//!
//! Rules are evaluated top to bottom against the lowercased
//! `"{alert_type} {description}"`; the first rule with any matching keyword
//! wins. Reasons are fixed operator-facing text per category.

use crate::alert::Alert;
use crate::decision::{Action, Confidence, Decision};

/// One keyword set and the decision it produces.
#[derive(Debug)]
pub struct Rule {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub action: Action,
    pub confidence: Confidence,
    pub reason: &'static str,
}

impl Rule {
    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|kw| text.contains(kw))
    }

    fn decision(&self) -> Decision {
        Decision::new(self.action, self.reason, self.confidence)
    }
}

/// Ordered rule table. Order is significant: `"security update"` must hit
/// the reboot rule before the generic security rule sees `"security"`.
pub const RULES: &[Rule] = &[
    Rule {
        name: "reboot",
        keywords: &[
            "reboot",
            "restart",
            "pending reboot",
            "windows update",
            "security update",
        ],
        action: Action::Reboot,
        confidence: Confidence::High,
        reason: "System requires restart to complete pending updates",
    },
    Rule {
        name: "critical_service",
        keywords: &[
            "service stopped",
            "sql server",
            "database",
            "critical error",
            "system down",
        ],
        action: Action::CreateTicket,
        confidence: Confidence::High,
        reason: "Critical service failure requires immediate technician attention",
    },
    Rule {
        name: "storage",
        keywords: &["disk space", "storage", "drive full", "documents folder"],
        action: Action::NotifyClient,
        confidence: Confidence::High,
        reason: "Storage consumption requires client cleanup",
    },
    Rule {
        name: "connectivity",
        keywords: &[
            "offline",
            "printer",
            "network",
            "connectivity",
            "unreachable",
        ],
        action: Action::CreateTicket,
        confidence: Confidence::Medium,
        reason: "Network or device connectivity issue requires technician investigation",
    },
    Rule {
        name: "security",
        keywords: &["security", "failed login", "firewall", "blocked"],
        action: Action::CreateTicket,
        confidence: Confidence::High,
        reason: "Security alert requires immediate investigation",
    },
    Rule {
        name: "transient",
        keywords: &["antivirus update", "temporary", "low battery", "retry"],
        action: Action::Ignore,
        confidence: Confidence::Medium,
        reason: "Transient condition expected to resolve automatically",
    },
];

/// Reason attached when no rule matches.
pub const UNRECOGNIZED_REASON: &str = "Unrecognized pattern, requires review.";

/// Keyword-driven fallback classifier. Total: every alert gets a decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, alert: &Alert) -> Decision {
        let text = search_text(alert);
        match matching_rule(&text) {
            Some(rule) => rule.decision(),
            None => Decision::new(Action::CreateTicket, UNRECOGNIZED_REASON, Confidence::Low),
        }
    }
}

/// Name of the rule that would fire for `alert`, or `None` for the default.
pub fn matched_rule_name(alert: &Alert) -> Option<&'static str> {
    matching_rule(&search_text(alert)).map(|r| r.name)
}

fn matching_rule(text: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.matches(text))
}

fn search_text(alert: &Alert) -> String {
    format!("{} {}", alert.alert_type(), alert.description()).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn alert(alert_type: &str, description: &str) -> Alert {
        Alert::new(
            "ALT-TEST-001",
            "TEST-SERVER-01",
            alert_type,
            description,
            "High",
            Utc::now(),
            "",
        )
        .unwrap()
    }

    fn classify(alert_type: &str, description: &str) -> Decision {
        RuleClassifier::new().classify(&alert(alert_type, description))
    }

    #[test]
    fn pending_reboot_is_high_confidence_reboot() {
        let d = classify(
            "Pending Reboot",
            "system requires restart after Windows updates",
        );
        assert_eq!(d.action(), Action::Reboot);
        assert_eq!(d.confidence(), Confidence::High);
    }

    #[test]
    fn each_category_maps_to_its_action() {
        let cases = [
            ("Service Stopped", "SQL Server service has stopped", Action::CreateTicket, Confidence::High),
            ("Disk Space Low", "Documents folder is 40GB", Action::NotifyClient, Confidence::High),
            ("Printer Offline", "HP LaserJet unreachable", Action::CreateTicket, Confidence::Medium),
            ("Firewall", "Multiple failed login attempts", Action::CreateTicket, Confidence::High),
            ("Antivirus Update", "definitions update will retry", Action::Ignore, Confidence::Medium),
            ("Low Battery", "UPS on battery", Action::Ignore, Confidence::Medium),
        ];
        for (alert_type, description, action, confidence) in cases {
            let d = classify(alert_type, description);
            assert_eq!(d.action(), action, "{alert_type}");
            assert_eq!(d.confidence(), confidence, "{alert_type}");
        }
    }

    #[test]
    fn earlier_rule_wins_when_several_match() {
        // Matches both the reboot and critical-service keyword sets.
        let d = classify("Database Server", "pending reboot after SQL Server patch");
        assert_eq!(d.action(), Action::Reboot);

        // "security update" belongs to the reboot rule, not the security rule.
        let d = classify("Security Update", "installed, awaiting reboot window");
        assert_eq!(d.action(), Action::Reboot);
        assert_eq!(
            matched_rule_name(&alert("Security Update", "installed")),
            Some("reboot")
        );

        // Storage outranks connectivity.
        let d = classify("Network Storage", "NAS drive full");
        assert_eq!(d.action(), Action::NotifyClient);
    }

    #[test]
    fn unmatched_alert_defaults_to_low_confidence_ticket() {
        let d = classify("Unknown Alert", "Some random alert description");
        assert_eq!(d.action(), Action::CreateTicket);
        assert_eq!(d.confidence(), Confidence::Low);
        assert_eq!(d.reason(), UNRECOGNIZED_REASON);
        assert_eq!(
            matched_rule_name(&alert("Unknown Alert", "random")),
            None
        );
    }

    #[test]
    fn matching_is_case_insensitive_over_type_and_description() {
        let d = classify("WINDOWS UPDATE", "");
        assert_eq!(d.action(), Action::Reboot);

        // Keyword split across type and description still counts once joined.
        let d = classify("Service", "Stopped unexpectedly");
        assert_eq!(d.action(), Action::CreateTicket);
        assert_eq!(d.confidence(), Confidence::High);
    }

    #[test]
    fn raw_text_is_not_searched() {
        let a = Alert::new("A", "D", "Heartbeat", "ok", "Info", Utc::now(), "reboot now")
            .unwrap();
        let d = RuleClassifier::new().classify(&a);
        assert_eq!(d.reason(), UNRECOGNIZED_REASON);
    }

    #[test]
    fn every_rule_has_non_empty_reason_and_keywords() {
        for rule in RULES {
            assert!(!rule.reason.is_empty(), "{}", rule.name);
            assert!(!rule.keywords.is_empty(), "{}", rule.name);
        }
    }
}
