//! Relay between the Ollama fragment stream and the outward event protocol.
//!
//! Contract: a request emits zero or more `Content` events followed by
//! exactly one terminal event, `Done` or `Error`. After the terminal event
//! the stream ends; dropping it early releases the upstream connection.

use chatbridge_ai::{AiError, Message, OllamaClient, OllamaConfig, build_conversation};
use futures::{Stream, StreamExt};
use serde::Serialize;

/// Outward error category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConnectionError,
    GeneralError,
}

impl From<&AiError> for ErrorKind {
    fn from(err: &AiError) -> Self {
        if err.is_connection() {
            Self::ConnectionError
        } else {
            Self::GeneralError
        }
    }
}

/// One outward event, serialized verbatim into an SSE `data:` frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RelayEvent {
    Content {
        content: String,
    },
    Done {
        done: bool,
    },
    Error {
        error: String,
        #[serde(rename = "type")]
        kind: ErrorKind,
    },
}

impl RelayEvent {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content {
            content: text.into(),
        }
    }

    pub fn done() -> Self {
        Self::Done { done: true }
    }

    pub fn error(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self::Error {
            error: message.into(),
            kind,
        }
    }

    /// True for `Done` and `Error`, the events that end a request.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Content { .. })
    }
}

/// Turn an upstream failure into the outward error event.
fn error_event(err: &AiError) -> RelayEvent {
    let kind = ErrorKind::from(err);
    let message = match kind {
        ErrorKind::ConnectionError => err.to_string(),
        ErrorKind::GeneralError => format!("An error occurred: {}", err),
    };
    RelayEvent::error(message, kind)
}

/// Run one chat request end to end, emitting the outward event sequence.
///
/// When `custom_instructions` is present the shared default `config` is
/// copied into a request-scoped one with an augmented system prompt; the
/// value passed in is never visible to other requests.
pub fn relay_events(
    config: OllamaConfig,
    history: Vec<Message>,
    custom_instructions: Option<String>,
    message: String,
) -> impl Stream<Item = RelayEvent> {
    async_stream::stream! {
        let config = match custom_instructions.as_deref() {
            Some(instructions) if !instructions.is_empty() => {
                config.with_custom_instructions(instructions)
            }
            _ => config,
        };
        let client = OllamaClient::new(config);

        if let Err(err) = client.check_alive().await {
            tracing::warn!(backend = %client.config().base_url, error = %err, "Ollama liveness probe failed");
            yield RelayEvent::error(
                format!(
                    "Ollama server is not running at {}. Please start Ollama with 'ollama serve' in a terminal.",
                    client.config().base_url
                ),
                ErrorKind::ConnectionError,
            );
            return;
        }

        let conversation =
            build_conversation(&client.config().system_prompt, &history, &message);

        let mut fragments = client.stream_chat(conversation);
        while let Some(fragment) = fragments.next().await {
            match fragment {
                Ok(fragment) => yield RelayEvent::content(fragment.content),
                Err(err) => {
                    tracing::warn!(error = %err, "Upstream chat stream failed");
                    yield error_event(&err);
                    return;
                }
            }
        }

        yield RelayEvent::done();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatbridge_ai::DEFAULT_SYSTEM_PROMPT;
    use futures::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn disable_system_proxy_for_tests() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            // Safety: set once for the process before any HTTP clients are built.
            unsafe {
                std::env::set_var("CHATBRIDGE_DISABLE_SYSTEM_PROXY", "1");
            }
        });
    }

    fn test_config(base_url: &str) -> OllamaConfig {
        disable_system_proxy_for_tests();
        OllamaConfig::new(base_url, "llama3")
    }

    async fn collect_events(
        config: OllamaConfig,
        history: Vec<Message>,
        custom_instructions: Option<String>,
        message: &str,
    ) -> Vec<RelayEvent> {
        relay_events(config, history, custom_instructions, message.to_string())
            .collect()
            .await
    }

    async fn mock_backend(chat_body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"models\":[]}"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(chat_body.as_bytes().to_vec(), "application/x-ndjson"),
            )
            .mount(&server)
            .await;
        server
    }

    fn unreachable_base_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}", addr)
    }

    #[test]
    fn test_events_serialize_to_wire_shapes() {
        assert_eq!(
            serde_json::to_string(&RelayEvent::content("hi")).unwrap(),
            "{\"content\":\"hi\"}"
        );
        assert_eq!(
            serde_json::to_string(&RelayEvent::done()).unwrap(),
            "{\"done\":true}"
        );
        assert_eq!(
            serde_json::to_string(&RelayEvent::error("boom", ErrorKind::ConnectionError)).unwrap(),
            "{\"error\":\"boom\",\"type\":\"connection_error\"}"
        );
        assert_eq!(
            serde_json::to_string(&RelayEvent::error("boom", ErrorKind::GeneralError)).unwrap(),
            "{\"error\":\"boom\",\"type\":\"general_error\"}"
        );
    }

    #[tokio::test]
    async fn test_probe_failure_emits_exactly_one_connection_error() {
        let base_url = unreachable_base_url();

        let events = collect_events(test_config(&base_url), vec![], None, "hello").await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            RelayEvent::Error { error, kind } => {
                assert_eq!(*kind, ErrorKind::ConnectionError);
                assert!(error.contains(&base_url));
                assert!(error.contains("ollama serve"));
            }
            other => panic!("expected connection error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fragments_relay_in_order_then_done() {
        let body = "{\"message\":{\"content\":\"a\"},\"done\":false}\n\
                    {\"message\":{\"content\":\"b\"},\"done\":false}\n\
                    {\"message\":{\"content\":\"c\"},\"done\":false}\n\
                    {\"done\":true}\n";
        let server = mock_backend(body).await;

        let events = collect_events(test_config(&server.uri()), vec![], None, "hello").await;

        assert_eq!(
            events,
            vec![
                RelayEvent::content("a"),
                RelayEvent::content("b"),
                RelayEvent::content("c"),
                RelayEvent::done(),
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_backend_lines_produce_no_events() {
        let body = "{\"message\":{\"content\":\"a\"},\"done\":false}\n\
                    garbage\n\
                    {\"done\":true}\n";
        let server = mock_backend(body).await;

        let events = collect_events(test_config(&server.uri()), vec![], None, "hello").await;

        assert_eq!(events, vec![RelayEvent::content("a"), RelayEvent::done()]);
    }

    #[tokio::test]
    async fn test_upstream_error_status_emits_general_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("out of memory"))
            .mount(&server)
            .await;

        let events = collect_events(test_config(&server.uri()), vec![], None, "hello").await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            RelayEvent::Error { error, kind } => {
                assert_eq!(*kind, ErrorKind::GeneralError);
                assert!(error.starts_with("An error occurred:"));
                assert!(error.contains("out of memory"));
            }
            other => panic!("expected general error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_custom_instructions_augment_the_synthesized_prompt() {
        let server = mock_backend("{\"done\":true}\n").await;

        let events = collect_events(
            test_config(&server.uri()),
            vec![],
            Some("be terse".to_string()),
            "hello",
        )
        .await;
        assert_eq!(events, vec![RelayEvent::done()]);

        let requests = server.received_requests().await.unwrap();
        let chat = requests
            .iter()
            .find(|r| r.url.path() == "/api/chat")
            .expect("chat request sent");
        let payload: serde_json::Value = serde_json::from_slice(&chat.body).unwrap();
        assert_eq!(
            payload["messages"][0]["content"],
            format!(
                "{}\n\nAdditional instructions from user: be terse",
                DEFAULT_SYSTEM_PROMPT
            )
        );
    }

    // Known quirk, kept bug-for-bug: a caller-supplied leading system message
    // suppresses the default prompt AND any custom-instructions augmentation.
    #[tokio::test]
    async fn test_caller_system_message_suppresses_custom_instructions() {
        let server = mock_backend("{\"done\":true}\n").await;

        let history = vec![Message::system("You are a pirate."), Message::user("ahoy")];
        let events = collect_events(
            test_config(&server.uri()),
            history,
            Some("be terse".to_string()),
            "hello",
        )
        .await;
        assert_eq!(events, vec![RelayEvent::done()]);

        let requests = server.received_requests().await.unwrap();
        let chat = requests
            .iter()
            .find(|r| r.url.path() == "/api/chat")
            .expect("chat request sent");
        let payload: serde_json::Value = serde_json::from_slice(&chat.body).unwrap();

        assert_eq!(payload["messages"][0]["content"], "You are a pirate.");
        let serialized = payload["messages"].to_string();
        assert!(!serialized.contains("be terse"));
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = [0u8; 4096];
        loop {
            match tokio::time::timeout(Duration::from_millis(50), socket.read(&mut buf)).await {
                Ok(Ok(n)) if n > 0 => continue,
                _ => break,
            }
        }
    }

    /// A backend that passes the liveness probe, then streams two fragments
    /// on the chat request and severs the connection without a terminal
    /// chunk.
    async fn spawn_dropping_backend() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            // Probe connection: complete response, closed so the chat request
            // opens a fresh connection.
            let (mut probe, _) = listener.accept().await.unwrap();
            read_request(&mut probe).await;
            probe
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}",
                )
                .await
                .unwrap();
            probe.shutdown().await.ok();

            // Chat connection: two chunked fragments, then a hard drop.
            let (mut chat, _) = listener.accept().await.unwrap();
            read_request(&mut chat).await;
            let mut response = String::from(
                "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n",
            );
            for i in 0..2 {
                let line =
                    format!("{{\"message\":{{\"content\":\"chunk{}\"}},\"done\":false}}\n", i);
                response.push_str(&format!("{:x}\r\n{}\r\n", line.len(), line));
            }
            chat.write_all(response.as_bytes()).await.unwrap();
            chat.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_mid_stream_drop_still_ends_with_terminal_event() {
        let base_url = spawn_dropping_backend().await;

        let events = collect_events(test_config(&base_url), vec![], None, "hello").await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], RelayEvent::content("chunk0"));
        assert_eq!(events[1], RelayEvent::content("chunk1"));
        assert!(matches!(events[2], RelayEvent::Error { .. }));
        assert!(events[2].is_terminal());
    }
}
