//! Chat provider speaking the OpenAI `/v1/chat/completions` wire format,
//! usable against OpenAI itself or any compatible gateway by overriding
//! `base_url`.

use async_trait::async_trait;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::{GenerateStream, LlmProvider};
use futures::stream;
use reqwest::Client;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub struct OpenAiCompatibleLlmProvider {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http_client: Client,
    retry: RetryPolicy,
}

impl OpenAiCompatibleLlmProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: String, http_client: Client) -> Self {
        OpenAiCompatibleLlmProvider {
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model,
            timeout: Duration::from_secs(120),
            http_client,
            retry: RetryPolicy::default(),
        }
    }

    async fn chat(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<String, ProviderError> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let payload = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "stream": false,
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("chat completions request failed: {e}")))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return Err(ProviderError::RateLimited { retry_after_ms });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Invocation(format!("chat completions returned {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Invocation(format!("invalid chat completions response: {e}")))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Invocation("missing choices[0].message.content in response".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleLlmProvider {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<String, ProviderError> {
        self.retry.retry(|| self.chat(prompt, system_prompt, max_tokens, temperature)).await
    }

    async fn generate_stream(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<GenerateStream, ProviderError> {
        // The rest of the system consumes streaming responses chunk-by-chunk
        // but never depends on sub-reply granularity, so a single-item
        // stream over the fully buffered reply satisfies the contract
        // without a separate SSE parser for this backend.
        let text = self.generate(prompt, system_prompt, max_tokens, temperature).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }

    fn name(&self) -> &str {
        &self.model
    }
}
