use super::{CompletionRequest, LlmClient, LlmResponse};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info_span, Instrument};

/// Wraps a client and records one span per request.
///
/// Prompts are never recorded; only sizes, model and outcome.
pub struct TracingLlmClient {
    inner: Arc<dyn LlmClient>,
}

impl TracingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LlmClient for TracingLlmClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse> {
        let span = info_span!(
            "llm.client.request",
            "llm.provider" = self.inner.provider_name(),
            "llm.request.model" = tracing::field::Empty,
            "llm.prompt.chars" = request.prompt.len(),
            "llm.usage.input_tokens" = tracing::field::Empty,
            "llm.usage.output_tokens" = tracing::field::Empty,
            "llm.latency_ms" = tracing::field::Empty,
            "error" = tracing::field::Empty,
            "error.message" = tracing::field::Empty
        );

        async move {
            let start = std::time::Instant::now();
            let result = self.inner.complete(request).await;
            let span = tracing::Span::current();
            span.record("llm.latency_ms", start.elapsed().as_millis() as u64);

            match &result {
                Ok(resp) => {
                    span.record("llm.request.model", resp.model.as_str());
                    if let Some(usage) = resp.meta.get("usage") {
                        if let Some(i) = usage.get("input_tokens").and_then(|v| v.as_u64()) {
                            span.record("llm.usage.input_tokens", i);
                        }
                        if let Some(o) = usage.get("output_tokens").and_then(|v| v.as_u64()) {
                            span.record("llm.usage.output_tokens", o);
                        }
                    }
                }
                Err(e) => {
                    span.record("error", true);
                    span.record("error.message", e.to_string().as_str());
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::fake::FakeClient;

    #[tokio::test]
    async fn passes_through_response_and_errors() {
        let inner = Arc::new(FakeClient::new("gpt-4".to_string()).with_script(["{}"]));
        let client = TracingLlmClient::new(inner);
        let req = CompletionRequest::new("sys", "prompt");

        let res = client.complete(&req).await.unwrap();
        assert_eq!(res.text, "{}");
        assert_eq!(client.provider_name(), "fake");
        assert!(client.complete(&req).await.is_err());
    }
}
