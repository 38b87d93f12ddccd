pub mod fake;
pub mod openai;
pub mod tracing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One chat completion request: a system instruction plus a user prompt.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub prompt: &'a str,
    /// Overrides the client's default model when set.
    pub model: Option<&'a str>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(system: &'a str, prompt: &'a str) -> Self {
        Self {
            system,
            prompt,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Text transport to a language model. Retries, if any, belong here and not
/// in the grading protocol.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse>;

    fn provider_name(&self) -> &'static str;
}
