use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ProviderError;

/// A single chunk of a streamed generation, or a terminal error.
pub type GenerateStream = BoxStream<'static, Result<String, ProviderError>>;

/// Capability interface for text generation. The LLM Cache (§4.6) wraps any
/// implementation of this trait as a decorator, so both concrete providers
/// and the cache itself satisfy `LlmProvider`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, ProviderError>;

    async fn generate_stream(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<GenerateStream, ProviderError>;

    fn name(&self) -> &str;
}
