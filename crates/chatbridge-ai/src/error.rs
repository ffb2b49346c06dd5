//! Error types for the Ollama client

use thiserror::Error;

/// Failures on the upstream chat leg
#[derive(Error, Debug)]
pub enum AiError {
    #[error(
        "Failed to connect to Ollama server at {url}. Please ensure Ollama is running (run 'ollama serve' in terminal)."
    )]
    Connection { url: String },

    #[error("Request to Ollama server timed out. The model may be taking too long to respond.")]
    Timeout,

    #[error("Ollama API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Error communicating with Ollama: {0}")]
    Transport(String),
}

impl AiError {
    /// True for failures where the backend was unreachable, as opposed to a
    /// fault on an established exchange.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Classify a transport-level reqwest failure.
    pub(crate) fn from_reqwest(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_connect() {
            Self::Connection {
                url: base_url.to_string(),
            }
        } else if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, AiError>;
