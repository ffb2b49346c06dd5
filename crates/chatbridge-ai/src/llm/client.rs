//! Chat types and session configuration

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// System prompt used when the caller does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and professional AI assistant. \
Answer concisely, clearly and politely. \
Use emojis appropriately to make your responses more engaging and visually appealing. \
Use emojis to express emotions, highlight important points, or add visual interest to your messages. \
Be natural and don't overuse emojis - use them to enhance communication, not distract from it.";

/// Chat message role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One decoded line of the Ollama response stream.
///
/// `done` records whether the line carried the backend's top-level completion
/// flag; the stream ends once a `done` line has been decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatFragment {
    pub content: String,
    pub done: bool,
}

/// Lazy fragment sequence returned by `stream_chat`, consumed exactly once
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<ChatFragment>> + Send>>;

/// Connection settings for one chat session.
///
/// The process-wide default is shared read-only across requests; request-level
/// customization derives a new value via
/// [`OllamaConfig::with_custom_instructions`] instead of mutating the shared
/// copy.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
}

impl OllamaConfig {
    /// Create a config with the default system prompt
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Replace the system prompt template
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Derive a request-scoped config whose system prompt carries extra
    /// caller-supplied instructions. `self` is left untouched.
    pub fn with_custom_instructions(&self, instructions: &str) -> Self {
        let mut derived = self.clone();
        derived.system_prompt = format!(
            "{}\n\nAdditional instructions from user: {}",
            self.system_prompt, instructions
        );
        derived
    }
}
