use super::{CompletionRequest, LlmClient, LlmResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A prompt the fake client received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub prompt: String,
}

/// Deterministic client that replays scripted replies in order.
///
/// Once the script runs out, `fixed_response` is returned if set; otherwise the
/// call fails.
#[derive(Debug)]
pub struct FakeClient {
    model: String,
    script: Mutex<VecDeque<String>>,
    fixed_response: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeClient {
    pub fn new(model: String) -> Self {
        Self {
            model,
            script: Mutex::new(VecDeque::new()),
            fixed_response: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, response: String) -> Self {
        self.fixed_response = Some(response);
        self
    }

    pub fn with_script<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script
            .lock()
            .expect("fake script lock")
            .extend(replies.into_iter().map(Into::into));
        self
    }

    /// Every call received so far, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("fake calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("fake calls lock").len()
    }
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse> {
        self.calls
            .lock()
            .expect("fake calls lock")
            .push(RecordedCall {
                system: request.system.to_string(),
                prompt: request.prompt.to_string(),
            });

        let next = self.script.lock().expect("fake script lock").pop_front();
        let text = match next.or_else(|| self.fixed_response.clone()) {
            Some(t) => t,
            None => anyhow::bail!("fake client: no more scripted responses"),
        };

        Ok(LlmResponse {
            text,
            provider: "fake".to_string(),
            model: request.model.unwrap_or(&self.model).to_string(),
            meta: serde_json::json!({}),
        })
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
