//! Remote embedding provider backed by a local Ollama server's
//! `/api/embeddings` endpoint. Ollama has no batch embedding call, so
//! requests are issued sequentially per text.

use async_trait::async_trait;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::EmbeddingProvider;
use reqwest::Client;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub struct OllamaEmbeddingProvider {
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
    http_client: Client,
    retry: RetryPolicy,
}

impl OllamaEmbeddingProvider {
    pub fn new(base_url: String, model: String, dimension: usize, http_client: Client) -> Self {
        OllamaEmbeddingProvider {
            base_url,
            model,
            dimension,
            timeout: Duration::from_secs(30),
            http_client,
            retry: RetryPolicy::default(),
        }
    }

    async fn fetch_single_embedding(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let payload = serde_json::json!({
            "model": self.model,
            "prompt": text,
            "stream": false,
        });

        let response = self
            .http_client
            .post(format!("{}/api/embeddings", self.base_url.trim_end_matches('/')))
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("ollama request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Invocation(format!(
                "ollama embeddings returned {status}: {body}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Invocation(format!("invalid ollama response body: {e}")))?;

        body["embedding"]
            .as_array()
            .ok_or_else(|| ProviderError::Invocation("missing embedding array in ollama response".to_string()))?
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| ProviderError::Invocation("non-numeric embedding element".to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            let embedding = self.retry.retry(|| self.fetch_single_embedding(text)).await?;
            results.push(embedding);
        }
        Ok(results)
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
    async fn embeds_each_text_sequentially() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding": [0.1, 0.2, 0.3]}"#)
            .expect(2)
            .create_async()
            .await;

        let provider = OllamaEmbeddingProvider::new(server.url(), "nomic-embed-text".to_string(), 3, Client::new());
        let result = provider.embed(&["a".to_string(), "b".to_string()]).await.unwrap();

        assert_eq!(result, vec![vec![0.1, 0.2, 0.3], vec![0.1, 0.2, 0.3]]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_batch_skips_the_request() {
        let server = mockito::Server::new_async().await;
        let provider = OllamaEmbeddingProvider::new(server.url(), "nomic-embed-text".to_string(), 3, Client::new());
        assert_eq!(provider.embed(&[]).await.unwrap(), Vec::<Vec<f32>>::new());
    }

    #[tokio::test]
    async fn non_success_status_is_an_invocation_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/embeddings")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let provider = OllamaEmbeddingProvider::new(server.url(), "nomic-embed-text".to_string(), 3, Client::new());
        let err = provider.embed(&["a".to_string()]).await.unwrap_err();

        assert!(matches!(err, ProviderError::Invocation(_)));
        mock.assert_async().await;
    }
}
