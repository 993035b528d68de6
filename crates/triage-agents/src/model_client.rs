//! Model client capability.
//!
//! The classification engine only needs "prompt in, text out". Keeping the
//! seam this narrow lets tests drive the engine with deterministic fakes
//! while production talks to an OpenAI-compatible endpoint through rig.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use tracing::debug;

use crate::config::ModelConfig;
use crate::errors::ModelError;

/// Type alias for agents built from OpenAI-compatible endpoints.
pub type OaiAgent = Agent<openai::completion::CompletionModel>;

/// System preamble for the classification agent. The task itself is carried
/// by the rendered prompt.
const CLASSIFIER_PREAMBLE: &str = "You classify infrastructure monitoring alerts. \
Reply with a single JSON object and nothing else.";

/// Sends a rendered prompt to a language model and returns the raw reply.
///
/// Implementations own their transport deadline; no retries are expected.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Model client backed by a rig agent on an OpenAI-compatible endpoint.
pub struct RigModelClient {
    agent: OaiAgent,
    model: String,
    timeout: Duration,
}

impl RigModelClient {
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let client = openai::CompletionsClient::builder()
            .api_key(&config.api_key)
            .base_url(&config.base_url)
            .build()
            .with_context(|| format!("Failed to build model client for {}", config.base_url))?;

        let agent = client
            .agent(&config.model)
            .name("alert_classifier")
            .preamble(CLASSIFIER_PREAMBLE)
            .temperature(0.1)
            .max_tokens(config.max_tokens)
            .build();

        Ok(Self {
            agent,
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ModelClient for RigModelClient {
    async fn invoke(&self, prompt: &str) -> Result<String, ModelError> {
        debug!(model = %self.model, prompt_len = prompt.len(), "Invoking model");

        let reply = tokio::time::timeout(self.timeout, async {
            self.agent.prompt(prompt).await
        })
        .await
        .map_err(|_| ModelError::Timeout(self.timeout.as_secs()))?
        .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        debug!(model = %self.model, reply_len = reply.len(), "Model replied");
        Ok(reply)
    }
}
