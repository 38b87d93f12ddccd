use super::{CompletionRequest, LlmClient, LlmResponse};
use async_trait::async_trait;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIClient {
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub max_tokens: u32,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(model: String, api_key: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model,
            api_key,
            temperature,
            max_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from `OPENAI_API_KEY` (and optional `OPENAI_BASE_URL`).
    pub fn from_env(model: String, temperature: f32, max_tokens: u32) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not found"))?;
        let mut client = Self::new(model, api_key, temperature, max_tokens);
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            client.base_url = base.trim_end_matches('/').to_string();
        }
        Ok(client)
    }

    fn request_body(&self, request: &CompletionRequest<'_>) -> serde_json::Value {
        json!({
            "model": request.model.unwrap_or(&self.model),
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt }
            ],
            "temperature": request.temperature.unwrap_or(self.temperature),
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: &CompletionRequest<'_>) -> anyhow::Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(request);

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_else(|_| String::new());
            anyhow::bail!(
                "OpenAI chat API error (status {}): {}",
                status.as_u16(),
                error_text
            );
        }

        let json: serde_json::Value = resp.json().await?;

        let text = json
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("OpenAI API response missing content"))?
            .trim()
            .to_string();

        let model = json
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| request.model.unwrap_or(&self.model))
            .to_string();

        let usage = json.get("usage").map(|u| {
            json!({
                "input_tokens": u.get("prompt_tokens"),
                "output_tokens": u.get("completion_tokens"),
            })
        });

        Ok(LlmResponse {
            text,
            provider: "openai".to_string(),
            model,
            meta: json!({ "usage": usage }),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_system_and_overrides() {
        let client = OpenAIClient::new("gpt-4o-mini".to_string(), "k".to_string(), 0.3, 2048);
        let mut req = CompletionRequest::new("be strict", "grade this");
        req.model = Some("gpt-4o");
        req.max_tokens = Some(64);

        let body = client.request_body(&req);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be strict");
        assert_eq!(body["messages"][1]["content"], "grade this");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }
}
