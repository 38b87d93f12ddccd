pub mod grader;

use crate::config::GraderConfig;
use crate::judge::LlmJudgeOracle;
use crate::providers::llm::tracing::TracingLlmClient;
use crate::providers::llm::LlmClient;
use std::sync::Arc;

pub use grader::Grader;

/// Wrap `client` with request tracing and the configured model, sampling and deadline.
pub fn build_oracle(config: &GraderConfig, client: Arc<dyn LlmClient>) -> LlmJudgeOracle {
    let traced: Arc<dyn LlmClient> = Arc::new(TracingLlmClient::new(client));
    LlmJudgeOracle::new(traced, config.judge.timeout())
        .with_model(config.judge.model.clone())
        .with_temperature(config.judge.temperature)
        .with_max_tokens(config.judge.max_tokens)
}
