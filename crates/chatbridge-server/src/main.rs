mod api;
mod config;
mod relay;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use chatbridge_ai::OllamaConfig;
use tower_http::cors::CorsLayer;

use api::state::AppState;
use config::ServerConfig;

#[tokio::main]
async fn main() {
    // Initialize tracing logger
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatbridge_server=debug".into()),
        )
        .with_target(false)
        .init();

    let server_config = ServerConfig::load().expect("Failed to load server configuration");

    tracing::info!(
        backend = %server_config.ollama_url,
        model = %server_config.model,
        "Starting ChatBridge server"
    );

    let state = AppState {
        ollama: Arc::new(OllamaConfig::new(
            &server_config.ollama_url,
            &server_config.model,
        )),
    };

    // Allow the browser frontend from any origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(api::status))
        .route("/chat", post(api::chat::chat))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", server_config.host, server_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!("ChatBridge running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
