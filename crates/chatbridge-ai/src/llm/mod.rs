//! LLM module - Ollama streaming client and conversation assembly

mod client;
mod conversation;
mod ollama;

pub use client::{
    ChatFragment, DEFAULT_SYSTEM_PROMPT, FragmentStream, Message, OllamaConfig, Role,
};
pub use conversation::build_conversation;
pub use ollama::OllamaClient;
