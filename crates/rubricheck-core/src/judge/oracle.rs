//! Judge oracle capability: prompt in, parsed JSON object out.

use super::judge_internal::client;
use crate::errors::GradeError;
use crate::providers::llm::{CompletionRequest, LlmClient};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait JudgeOracle: Send + Sync {
    /// Returns the judgment object, or fails on transport or unrecoverable JSON.
    async fn judge(&self, system: &str, prompt: &str) -> Result<serde_json::Value, GradeError>;
}

/// Oracle backed by an [`LlmClient`] with a per-call deadline.
pub struct LlmJudgeOracle {
    client: Arc<dyn LlmClient>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl LlmJudgeOracle {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            client,
            model: None,
            temperature: None,
            max_tokens: None,
            timeout,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl JudgeOracle for LlmJudgeOracle {
    async fn judge(&self, system: &str, prompt: &str) -> Result<serde_json::Value, GradeError> {
        let request = CompletionRequest {
            system,
            prompt,
            model: self.model.as_deref(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = tokio::time::timeout(self.timeout, self.client.complete(&request))
            .await
            .map_err(|_| GradeError::Timeout {
                seconds: self.timeout.as_secs(),
            })?
            .map_err(GradeError::transport)?;

        client::extract_json_object(&resp.text)
    }
}
