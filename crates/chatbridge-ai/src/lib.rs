//! ChatBridge AI - streaming Ollama client
//!
//! This crate provides:
//! - A streaming client for the Ollama chat API (`/api/chat`, NDJSON)
//! - The pre-flight liveness probe against `/api/tags`
//! - Conversation assembly (system prompt + history + new message)
//! - A typed error taxonomy for the upstream leg

pub mod error;
mod http_client;
pub mod llm;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use llm::{
    ChatFragment, DEFAULT_SYSTEM_PROMPT, FragmentStream, Message, OllamaClient, OllamaConfig,
    Role, build_conversation,
};
