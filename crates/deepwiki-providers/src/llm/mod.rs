//! §4.5 / §6 LLM Provider implementations: Ollama, OpenAI-compatible, and
//! Anthropic, each speaking its own wire format behind the shared
//! `LlmProvider` port. Remote calls are wrapped by the shared `RetryPolicy`.

mod anthropic;
mod ollama;
mod openai_compatible;

pub use anthropic::AnthropicLlmProvider;
pub use ollama::OllamaLlmProvider;
pub use openai_compatible::OpenAiCompatibleLlmProvider;
