mod config;
mod error;
mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use poker_core::registry::Registry;
use poker_core::session::SessionConfig;
use poker_transport::Argon2Verifier;

use config::{Args, GuessConfig};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let guesses = GuessConfig::from_env()?;

    let verifier: Arc<dyn poker_core::verifier::PasswordVerifier> = Arc::new(Argon2Verifier::new());
    let registry = Registry::new(verifier.clone());

    let state = AppState {
        registry,
        verifier,
        guesses: Arc::new(guesses),
        session_config: SessionConfig::default(),
    };

    let app = routes::build(state)
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&args.bind_addr).await?;
    tracing::info!(addr = %args.bind_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
