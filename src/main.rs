//! threadchat - chat with a hosted assistant over threads and runs
//!
//! `threadchat serve` runs the HTTP gateway in front of the assistant
//! provider. `threadchat chat` opens a conversation against a gateway from
//! the terminal.

mod api;
mod assistants;
mod config;
mod message_store;
mod model;
mod polling;
mod runtime;
mod state_machine;
mod terminal;
mod transport;
mod view;
mod wire;

use api::{create_router, AppState};
use assistants::{AssistantsService, LoggingService, OpenAIAssistants};
use config::{ChatConfig, GatewayConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: threadchat [serve|chat]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mode = std::env::args().nth(1);
    match mode.as_deref() {
        None | Some("serve") => serve().await,
        Some("chat") => chat().await,
        Some("-h" | "--help" | "help") => {
            println!("{USAGE}");
            Ok(())
        }
        Some(other) => Err(format!("unknown command {other:?}\n{USAGE}").into()),
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadchat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = GatewayConfig::from_env()?;
    let provider = OpenAIAssistants::new(config.api_key.clone(), Some(&config.base_url))?;
    let assistants: Arc<dyn AssistantsService> = Arc::new(LoggingService::new(Arc::new(provider)));
    tracing::info!(base_url = %config.base_url, "Assistant provider configured");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(assistants))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("threadchat gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn chat() -> Result<(), Box<dyn std::error::Error>> {
    // stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadchat=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ChatConfig::from_env()?;
    terminal::run_chat(config).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
