//! Ollama chat provider. Performs a one-shot health check against
//! `/api/tags` on first use and raises `ModelNotFoundError` (with the
//! available set attached, per §7) if the configured model is absent.

use async_trait::async_trait;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::{GenerateStream, LlmProvider};
use futures::stream;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::retry::RetryPolicy;

pub struct OllamaLlmProvider {
    base_url: String,
    model: String,
    timeout: Duration,
    http_client: Client,
    retry: RetryPolicy,
    health_checked: OnceCell<()>,
}

impl OllamaLlmProvider {
    pub fn new(base_url: String, model: String, http_client: Client) -> Self {
        OllamaLlmProvider {
            base_url,
            model,
            timeout: Duration::from_secs(120),
            http_client,
            retry: RetryPolicy::default(),
            health_checked: OnceCell::new(),
        }
    }

    async fn ensure_model_available(&self) -> Result<(), ProviderError> {
        self.health_checked
            .get_or_try_init(|| async {
                let response = self
                    .http_client
                    .get(format!("{}/api/tags", self.base_url.trim_end_matches('/')))
                    .timeout(self.timeout)
                    .send()
                    .await
                    .map_err(|e| ProviderError::Connection(format!("ollama health check failed: {e}")))?;

                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Invocation(format!("invalid /api/tags response: {e}")))?;

                let available: Vec<String> = body["models"]
                    .as_array()
                    .map(|models| {
                        models
                            .iter()
                            .filter_map(|m| m["name"].as_str().map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();

                if available.iter().any(|name| name == &self.model) {
                    Ok(())
                } else {
                    Err(ProviderError::ModelNotFound { available })
                }
            })
            .await
            .map(|_| ())
    }

    async fn chat(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<String, ProviderError> {
        self.ensure_model_available().await?;

        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": prompt}));

        let payload = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "options": {
                "num_predict": max_tokens,
                "temperature": temperature,
            },
            "stream": false,
        });

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url.trim_end_matches('/')))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("ollama chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Invocation(format!("ollama chat returned {status}: {body}")));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Invocation(format!("invalid ollama chat response: {e}")))?;

        body["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Invocation("missing message.content in ollama response".to_string()))
    }
}

#[async_trait]
impl LlmProvider for OllamaLlmProvider {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<String, ProviderError> {
        self.retry.retry(|| self.chat(prompt, system_prompt, max_tokens, temperature)).await
    }

    async fn generate_stream(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<GenerateStream, ProviderError> {
        // Ollama's streaming chat responses are newline-delimited JSON rather
        // than SSE; collecting the full reply and emitting it as one chunk
        // keeps this provider's streaming contract honest without a second
        // parser for a format the rest of the system never inspects.
        let text = self.generate(prompt, system_prompt, max_tokens, temperature).await?;
        Ok(Box::pin(stream::once(async move { Ok(text) })))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn generates_a_reply_once_the_model_is_confirmed_available() {
        let mut server = mockito::Server::new_async().await;
        let tags_mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models": [{"name": "llama3"}]}"#)
            .create_async()
            .await;
        let chat_mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": {"role": "assistant", "content": "hello"}}"#)
            .create_async()
            .await;

        let provider = OllamaLlmProvider::new(server.url(), "llama3".to_string(), Client::new());
        let reply = provider.generate("hi", None, 128, 0.2).await.unwrap();

        assert_eq!(reply, "hello");
        tags_mock.assert_async().await;
        chat_mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_model_is_reported_with_the_available_set() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models": [{"name": "llama3"}]}"#)
            .create_async()
            .await;

        let provider = OllamaLlmProvider::new(server.url(), "mistral".to_string(), Client::new());
        let err = provider.generate("hi", None, 128, 0.2).await.unwrap_err();

        match err {
            ProviderError::ModelNotFound { available } => assert_eq!(available, vec!["llama3".to_string()]),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn generate_stream_yields_the_full_reply_as_one_item() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models": [{"name": "llama3"}]}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": {"role": "assistant", "content": "streamed"}}"#)
            .create_async()
            .await;

        let provider = OllamaLlmProvider::new(server.url(), "llama3".to_string(), Client::new());
        let mut stream = provider.generate_stream("hi", None, 128, 0.2).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();

        assert_eq!(first, "streamed");
        assert!(stream.next().await.is_none());
    }
}
