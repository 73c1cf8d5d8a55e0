//! Embedding Engine (C4, spec §4.4) — providers, bounded worker pool, and
//! retry/backoff policy for turning function and type code text into
//! vectors.

pub mod engine;
pub mod mock;
pub mod provider;
pub mod retry;

pub use engine::{run, EmbedOutcome, EngineConfig};
pub use provider::{EmbedReply, EmbedRequest, EmbeddingProvider, LlamaCppProvider, NomicProvider, OllamaProvider, OpenAiProvider};
