use async_trait::async_trait;

use crate::error::ProviderError;

/// Capability interface for turning text into vectors. Implementations live
/// in `deepwiki-providers` (a local CPU sentence-transformer and a remote,
/// network-fetched backend); the retry policy around remote calls is the
/// provider's concern, not this trait's.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Constant per instance: the output vector length.
    fn dimension(&self) -> usize;

    fn name(&self) -> &str;
}
