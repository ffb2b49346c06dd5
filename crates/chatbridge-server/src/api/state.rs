use std::sync::Arc;

use chatbridge_ai::OllamaConfig;

/// Shared handler state: the process-wide default Ollama config.
///
/// Read-only across requests; per-request customization clones the config
/// instead of mutating it.
#[derive(Clone)]
pub struct AppState {
    pub ollama: Arc<OllamaConfig>,
}
