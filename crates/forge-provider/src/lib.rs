//! `forge-provider`: uniform capability interface over the AI backends a
//! phase can delegate to: OpenAI-shaped and Anthropic-shaped chat HTTP APIs,
//! a local Ollama daemon, and external CLIs wrapped as subprocesses.
//!
//! ```text
//! ProviderSettings (forge-core config, tagged by backend kind)
//!     │
//!     ▼
//! ProviderManager   ← one construction point, compile-time exhaustive
//!     │
//!     ▼
//! dyn Provider      ← name / is_available / execute / execute_stream / models
//!     │
//!     ▼
//! ChunkStream       ← futures::Stream of partial content, done-terminated
//! ```

pub mod anthropic;
pub mod error;
pub mod exec;
pub mod manager;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod request;

pub(crate) mod lines;

pub use anthropic::AnthropicProvider;
pub use error::ProviderError;
pub use exec::ExecutableProvider;
pub use manager::ProviderManager;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use provider::{ChunkStream, Provider};
pub use request::{CompletionRequest, CompletionResponse, StreamChunk};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ProviderError>;
