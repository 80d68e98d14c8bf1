//! §4.4 Embedding Provider implementations: one local (CPU sentence
//! transformer via `fastembed`) and two remote, network-fetched backends
//! (Ollama, OpenAI-compatible). Remote calls are wrapped by the shared
//! `RetryPolicy`.

mod fastembed_provider;
mod ollama;
mod openai_compatible;

pub use fastembed_provider::FastEmbedProvider;
pub use ollama::OllamaEmbeddingProvider;
pub use openai_compatible::OpenAiCompatibleEmbeddingProvider;
