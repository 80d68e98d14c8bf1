//! Remote embedding provider speaking the OpenAI `/v1/embeddings` wire
//! format, usable against OpenAI itself or any compatible gateway by
//! overriding `base_url`.

use async_trait::async_trait;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::EmbeddingProvider;
use reqwest::Client;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub struct OpenAiCompatibleEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
    http_client: Client,
    retry: RetryPolicy,
}

impl OpenAiCompatibleEmbeddingProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        dimension: usize,
        http_client: Client,
    ) -> Self {
        OpenAiCompatibleEmbeddingProvider {
            api_key,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model,
            dimension,
            timeout: Duration::from_secs(30),
            http_client,
            retry: RetryPolicy::default(),
        }
    }

    async fn fetch_embeddings(&self, texts: &[String]) -> Result<serde_json::Value, ProviderError> {
        let payload = serde_json::json!({
            "input": texts,
            "model": self.model,
            "encoding_format": "float",
        });

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("embeddings request failed: {e}")))?;

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
            return Err(ProviderError::Invocation(format!("embeddings endpoint returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Invocation(format!("invalid embeddings response body: {e}")))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = self.retry.retry(|| self.fetch_embeddings(texts)).await?;

        let data = body["data"]
            .as_array()
            .ok_or_else(|| ProviderError::Invocation("missing data array in embeddings response".to_string()))?;

        if data.len() != texts.len() {
            return Err(ProviderError::Invocation(format!(
                "embeddings response count mismatch: expected {}, got {}",
                texts.len(),
                data.len()
            )));
        }

        data.iter()
            .map(|item| {
                item["embedding"]
                    .as_array()
                    .ok_or_else(|| ProviderError::Invocation("missing embedding array in response item".to_string()))?
                    .iter()
                    .map(|v| {
                        v.as_f64()
                            .map(|f| f as f32)
                            .ok_or_else(|| ProviderError::Invocation("non-numeric embedding element".to_string()))
                    })
                    .collect()
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn embeds_a_batch_in_one_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"embedding": [1.0, 2.0]}, {"embedding": [3.0, 4.0]}]}"#)
            .create_async()
            .await;

        let provider = OpenAiCompatibleEmbeddingProvider::new(
            "sk-test".to_string(),
            Some(server.url()),
            "text-embedding-3-small".to_string(),
            2,
            Client::new(),
        );
        let result = provider.embed(&["a".to_string(), "b".to_string()]).await.unwrap();

        assert_eq!(result, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn count_mismatch_is_an_invocation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data": [{"embedding": [1.0]}]}"#)
            .create_async()
            .await;

        let provider = OpenAiCompatibleEmbeddingProvider::new(
            "sk-test".to_string(),
            Some(server.url()),
            "text-embedding-3-small".to_string(),
            1,
            Client::new(),
        );
        let err = provider.embed(&["a".to_string(), "b".to_string()]).await.unwrap_err();
        assert!(matches!(err, ProviderError::Invocation(_)));
    }

    #[tokio::test]
    async fn rate_limit_status_maps_to_rate_limited_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embeddings")
            .with_status(429)
            .with_header("retry-after", "2")
            .create_async()
            .await;

        let provider = OpenAiCompatibleEmbeddingProvider::new(
            "sk-test".to_string(),
            Some(server.url()),
            "text-embedding-3-small".to_string(),
            1,
            Client::new(),
        );
        let err = provider.embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after_ms: Some(2000) }));
    }
}
