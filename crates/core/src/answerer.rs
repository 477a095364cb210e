use crate::error::ProviderError;
use crate::traits::Answerer;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1/";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";

/// Chat-completions answerer for Groq's OpenAI-compatible API.
#[derive(Clone)]
pub struct GroqAnswerer {
    client: Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl GroqAnswerer {
    pub fn new(
        client: Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            endpoint: Url::parse(&base)?.join("chat/completions")?,
            model: model.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl Answerer for GroqAnswerer {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn answer(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "requesting completion");

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&completion_request(&self.model, prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::BackendResponse {
                backend: "groq".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let parsed: Value = response.json().await?;
        completion_content(&parsed)
    }
}

fn completion_request(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "user", "content": prompt }
        ],
    })
}

fn completion_content(payload: &Value) -> Result<String, ProviderError> {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::BackendResponse {
            backend: "groq".to_string(),
            details: "no content found in completion response".to_string(),
        })
}
