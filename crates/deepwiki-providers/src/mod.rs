//! Concrete Embedding and LLM provider adapters. Each type implements a
//! `deepwiki-domain` port and is otherwise free to depend on whatever
//! concrete crate its backend needs (`reqwest`, `fastembed`) — this is the
//! one layer in the workspace allowed to do so.

pub mod embedding;
pub mod llm;
pub mod retry;

pub use embedding::{FastEmbedProvider, OllamaEmbeddingProvider, OpenAiCompatibleEmbeddingProvider};
pub use llm::{AnthropicLlmProvider, OllamaLlmProvider, OpenAiCompatibleLlmProvider};
pub use retry::RetryPolicy;
