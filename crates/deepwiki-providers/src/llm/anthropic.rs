//! Anthropic chat provider speaking the `/v1/messages` wire format.
//! Non-streaming calls return the concatenated text blocks; streaming
//! calls parse the SSE `content_block_delta` events as they arrive.

use async_trait::async_trait;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::{GenerateStream, LlmProvider};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::time::Duration;

use crate::retry::RetryPolicy;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicLlmProvider {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    http_client: Client,
    retry: RetryPolicy,
}

impl AnthropicLlmProvider {
    pub fn new(api_key: String, base_url: Option<String>, model: String, http_client: Client) -> Self {
        AnthropicLlmProvider {
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.anthropic.com/v1".to_string()),
            model,
            timeout: Duration::from_secs(120),
            http_client,
            retry: RetryPolicy::default(),
        }
    }

    fn request_builder(&self) -> reqwest::RequestBuilder {
        self.http_client
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(self.timeout)
    }

    fn payload(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64, stream: bool) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [{"role": "user", "content": prompt}],
            "stream": stream,
        });
        if let Some(system) = system_prompt {
            payload["system"] = serde_json::Value::String(system.to_string());
        }
        payload
    }

    async fn handle_error_status(response: reqwest::Response) -> ProviderError {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return ProviderError::RateLimited { retry_after_ms };
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ProviderError::Invocation(format!("anthropic messages returned {status}: {body}"))
    }

    async fn messages(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<String, ProviderError> {
        let payload = self.payload(prompt, system_prompt, max_tokens, temperature, false);

        let response = self
            .request_builder()
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("anthropic messages request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_status(response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Invocation(format!("invalid anthropic messages response: {e}")))?;

        let text = body["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| ProviderError::Invocation("missing content array in anthropic response".to_string()))?;

        Ok(text)
    }
}

#[async_trait]
impl LlmProvider for AnthropicLlmProvider {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<String, ProviderError> {
        self.retry.retry(|| self.messages(prompt, system_prompt, max_tokens, temperature)).await
    }

    async fn generate_stream(&self, prompt: &str, system_prompt: Option<&str>, max_tokens: u32, temperature: f64) -> Result<GenerateStream, ProviderError> {
        let payload = self.payload(prompt, system_prompt, max_tokens, temperature, true);

        let response = self
            .request_builder()
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("anthropic streaming request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Self::handle_error_status(response).await);
        }

        let text_deltas = parse_sse_text_deltas(response);
        Ok(Box::pin(text_deltas))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Folds a raw SSE byte stream into a stream of `content_block_delta` text
/// fragments, buffering across chunk boundaries since a single SSE event
/// may arrive split across several TCP reads.
fn parse_sse_text_deltas(response: reqwest::Response) -> impl futures::Stream<Item = Result<String, ProviderError>> + Send + 'static {
    stream::unfold((response.bytes_stream().boxed(), String::new()), |(mut stream, mut buffer)| async move {
        loop {
            if let Some(pos) = buffer.find("\n\n") {
                let event = buffer[..pos].to_string();
                buffer.drain(..pos + 2);
                if let Some(text) = extract_text_delta(&event) {
                    return Some((Ok(text), (stream, buffer)));
                }
                continue;
            }

            match stream.next().await {
                Some(Ok(chunk)) => {
                    buffer.push_str(&String::from_utf8_lossy(&chunk));
                }
                Some(Err(e)) => {
                    return Some((Err(ProviderError::Connection(format!("anthropic stream read failed: {e}"))), (stream, buffer)));
                }
                None => return None,
            }
        }
    })
}

fn extract_text_delta(event: &str) -> Option<String> {
    let data_line = event.lines().find_map(|line| line.strip_prefix("data: "))?;
    let json: serde_json::Value = serde_json::from_str(data_line).ok()?;
    if json["type"] != "content_block_delta" {
        return None;
    }
    json["delta"]["text"].as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn extracts_text_from_a_content_block_delta_event() {
        let event = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"hi\"}}";
        assert_eq!(extract_text_delta(event), Some("hi".to_string()));
    }

    #[test]
    fn ignores_non_content_block_delta_events() {
        let event = "event: message_start\ndata: {\"type\":\"message_start\"}";
        assert_eq!(extract_text_delta(event), None);
    }

    #[tokio::test]
    async fn generates_from_concatenated_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content": [{"type": "text", "text": "hel"}, {"type": "text", "text": "lo"}]}"#)
            .create_async()
            .await;

        let provider = AnthropicLlmProvider::new("sk-ant-test".to_string(), Some(server.url()), "claude-sonnet".to_string(), Client::new());
        let reply = provider.generate("hi", None, 128, 0.5).await.unwrap();

        assert_eq!(reply, "hello");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_stream_parses_sse_text_deltas() {
        let mut server = mockito::Server::new_async().await;
        let sse_body = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"he\"}}\n\nevent: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"delta\":{\"text\":\"llo\"}}\n\n";
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_body)
            .create_async()
            .await;

        let provider = AnthropicLlmProvider::new("sk-ant-test".to_string(), Some(server.url()), "claude-sonnet".to_string(), Client::new());
        let mut stream = provider.generate_stream("hi", None, 128, 0.5).await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "he");
        assert_eq!(stream.next().await.unwrap().unwrap(), "llo");
        assert!(stream.next().await.is_none());
    }
}
