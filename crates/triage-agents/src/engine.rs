//! Classification engine: ask the model, else fall back to rules.
//!
//! ```text
//! Start ─► ModelAttempt ─┬─ reply ──► parse ─┬─ ok ─────► Done
//!                        │                  └─ reject ─► Done
//!                        └─ error ──► RuleFallback ────► Done
//! Start ─(no client)──────────────────► RuleFallback ───► Done
//! ```
//!
//! The engine never fails: every path ends in a validated `Decision`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::alert::Alert;
use crate::decision::Decision;
use crate::model_client::ModelClient;
use crate::prompts::{render_classification_prompt, PROMPT_VERSION};
use crate::rules::{matched_rule_name, RuleClassifier};
use crate::validator;

/// Which path produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The model replied with a valid decision.
    Model,
    /// The model replied but the reply was rejected; the safe default stands.
    ModelRejected,
    /// The rule classifier decided (no client, or the model call failed).
    Rules,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => write!(f, "model"),
            Self::ModelRejected => write!(f, "model_rejected"),
            Self::Rules => write!(f, "rules"),
        }
    }
}

pub struct ClassificationEngine {
    model: Option<Arc<dyn ModelClient>>,
    rules: RuleClassifier,
}

impl ClassificationEngine {
    pub fn new(model: Option<Arc<dyn ModelClient>>) -> Self {
        Self {
            model,
            rules: RuleClassifier::new(),
        }
    }

    /// Engine without a model client; every alert takes the rule path.
    pub fn rules_only() -> Self {
        Self::new(None)
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn classify_with_fallback(&self, alert: &Alert) -> Decision {
        self.classify_with_provenance(alert).await.0
    }

    pub async fn classify_with_provenance(&self, alert: &Alert) -> (Decision, Provenance) {
        let Some(model) = &self.model else {
            debug!(alert_id = %alert.id(), "No model client configured, using rules");
            return (self.classify_by_rules(alert), Provenance::Rules);
        };

        let prompt = render_classification_prompt(alert);
        debug!(alert_id = %alert.id(), prompt_version = PROMPT_VERSION, "Invoking model");
        match model.invoke(&prompt).await {
            Ok(reply) => match validator::parse(&reply) {
                Ok(decision) => {
                    info!(
                        alert_id = %alert.id(),
                        action = %decision.action(),
                        confidence = %decision.confidence(),
                        "Model classified alert"
                    );
                    (decision, Provenance::Model)
                }
                Err(e) => {
                    warn!(
                        alert_id = %alert.id(),
                        kind = %e.kind(),
                        error = %e,
                        "Model reply rejected, substituting safe default"
                    );
                    (validator::reject(&e), Provenance::ModelRejected)
                }
            },
            Err(e) => {
                warn!(
                    alert_id = %alert.id(),
                    kind = %e.kind(),
                    error = %e,
                    "Model call failed, falling back to rules"
                );
                (self.classify_by_rules(alert), Provenance::Rules)
            }
        }
    }

    fn classify_by_rules(&self, alert: &Alert) -> Decision {
        let decision = self.rules.classify(alert);
        info!(
            alert_id = %alert.id(),
            rule = matched_rule_name(alert).unwrap_or("default"),
            action = %decision.action(),
            "Rule classifier decided"
        );
        decision
    }
}
