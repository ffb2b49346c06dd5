//! Ollama chat client
//!
//! Streams chat completions from a local Ollama server, decoding its
//! newline-delimited JSON response one line at a time. The client is a pure
//! pass-through decoder: no retries, no buffering beyond the current line.

use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{ChatFragment, FragmentStream, Message, OllamaConfig};

/// Overall limit for one streamed chat exchange, not per chunk
const STREAM_TIMEOUT: Duration = Duration::from_secs(300);
/// Limit for the pre-flight liveness probe
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Client for the Ollama chat API
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

#[derive(Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<StreamMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct StreamMessage {
    #[serde(default)]
    content: String,
}

impl OllamaClient {
    /// Create a client for the given session config
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            client: build_http_client(STREAM_TIMEOUT),
            config,
        }
    }

    /// The session config this client was built with
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Cheap pre-flight reachability check against `/api/tags`.
    pub async fn check_alive(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| AiError::from_reqwest(e, &self.config.base_url))?;

        if !response.status().is_success() {
            return Err(AiError::Connection {
                url: self.config.base_url.clone(),
            });
        }

        Ok(())
    }

    /// Stream one chat completion as decoded fragments.
    ///
    /// Yields one fragment per backend line that carries content and ends the
    /// sequence when the backend reports `done`, even if further bytes remain
    /// on the wire. A transport fault ends the sequence with a single `Err`.
    pub fn stream_chat(&self, conversation: Vec<Message>) -> FragmentStream {
        let client = self.client.clone();
        let base_url = self.config.base_url.clone();
        let model = self.config.model.clone();

        Box::pin(async_stream::stream! {
            let body = json!({
                "model": model,
                "messages": conversation,
                "stream": true,
                "options": {
                    "temperature": 0.7,
                    "num_predict": 500,
                }
            });

            let response = match client
                .post(format!("{}/api/chat", base_url))
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AiError::from_reqwest(e, &base_url));
                    return;
                }
            };

            if response.status() != StatusCode::OK {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                yield Err(AiError::Api { status, body });
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AiError::from_reqwest(e, &base_url));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Decode complete lines, carrying any partial tail over to the
                // next chunk.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].to_string();
                    buffer.drain(..=pos);

                    if let Some(fragment) = decode_line(&line) {
                        let done = fragment.done;
                        if !fragment.content.is_empty() {
                            yield Ok(fragment);
                        }
                        if done {
                            // Normal termination; remaining bytes are ignored.
                            return;
                        }
                    }
                }
            }

            // A final line without a trailing newline is still a valid frame.
            if let Some(fragment) = decode_line(&buffer)
                && !fragment.content.is_empty()
            {
                yield Ok(fragment);
            }
        })
    }
}

/// Decode one backend line. Blank or malformed lines are tolerated noise.
fn decode_line(line: &str) -> Option<ChatFragment> {
    if line.trim().is_empty() {
        return None;
    }

    let parsed: StreamLine = match serde_json::from_str(line) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed line from Ollama stream");
            return None;
        }
    };

    Some(ChatFragment {
        content: parsed.message.map(|m| m.content).unwrap_or_default(),
        done: parsed.done,
    })
}
