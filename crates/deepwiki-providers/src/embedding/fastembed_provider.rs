//! Local CPU sentence-transformer backend (§4.4: "at least one local").
//! `fastembed::TextEmbedding` is `!Sync` internally (it wraps an ONNX
//! session), so it is owned by a dedicated actor task and driven through a
//! channel — the same shape as the teacher's FastEmbed actor — rather than
//! behind a `Mutex` shared across the async runtime's worker threads.

use async_trait::async_trait;
use deepwiki_domain::error::ProviderError;
use deepwiki_domain::ports::EmbeddingProvider;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::{mpsc, oneshot};

const DEFAULT_DIMENSION: usize = 384; // AllMiniLML6V2

enum FastEmbedMessage {
    EmbedBatch {
        texts: Vec<String>,
        reply: oneshot::Sender<Result<Vec<Vec<f32>>, ProviderError>>,
    },
}

/// Local embedding provider backed by an ONNX sentence-transformer model
/// run entirely on-CPU, no network call involved.
pub struct FastEmbedProvider {
    sender: mpsc::Sender<FastEmbedMessage>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedProvider {
    pub fn try_new() -> Result<Self, ProviderError> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, DEFAULT_DIMENSION)
    }

    pub fn with_model(model: EmbeddingModel, dimension: usize) -> Result<Self, ProviderError> {
        let init_options = InitOptions::new(model.clone()).with_show_download_progress(false);
        let model_name = format!("{:?}", init_options.model_name);
        let text_embedding = TextEmbedding::try_new(init_options)
            .map_err(|e| ProviderError::Invocation(format!("failed to initialize fastembed model: {e}")))?;

        let (sender, receiver) = mpsc::channel(64);
        std::thread::spawn(move || run_actor(receiver, text_embedding));

        Ok(FastEmbedProvider {
            sender,
            model_name,
            dimension,
        })
    }
}

fn run_actor(mut receiver: mpsc::Receiver<FastEmbedMessage>, model: TextEmbedding) {
    let mut model = model;
    while let Some(msg) = receiver.blocking_recv() {
        match msg {
            FastEmbedMessage::EmbedBatch { texts, reply } => {
                let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                let result = model
                    .embed(text_refs, None)
                    .map_err(|e| ProviderError::Invocation(format!("fastembed inference failed: {e}")));
                let _ = reply.send(result);
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(FastEmbedMessage::EmbedBatch {
                texts: texts.to_vec(),
                reply,
            })
            .await
            .map_err(|_| ProviderError::Connection("fastembed actor channel closed".to_string()))?;
        rx.await.map_err(|_| ProviderError::Connection("fastembed actor dropped the reply channel".to_string()))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
