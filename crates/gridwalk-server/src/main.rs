//! Gridwalk server entry point.
//!
//! Binds the listener, starts the walk engine, and runs the accept loop
//! until QUIT or Ctrl-C. Exits 0 on ordinary shutdown and 1 if the listener
//! cannot be bound.
//!
//! ```text
//! main()
//!  └─ ServerConfig::load()   -- gridwalk.toml, optional
//!  └─ TcpListener::bind()
//!  └─ spawn run_engine()     -- walk engine task
//!  └─ serve()                -- accept loop until shutdown
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridwalk_server::{run_engine, serve, ServerConfig, ServerState};

const CONFIG_PATH: &str = "gridwalk.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load(Path::new(CONFIG_PATH))
        .with_context(|| format!("loading {CONFIG_PATH}"))?;

    // Structured logging. `RUST_LOG` overrides the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    // Optional port argument overrides the config file.
    let port = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<u16>()
            .with_context(|| format!("invalid port argument {arg:?}"))?,
        None => config.port,
    };

    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    info!("gridwalk server listening on port {port}");

    let state = ServerState::new(config.step_delay());

    let engine_state = Arc::clone(&state);
    let engine = tokio::spawn(async move {
        run_engine(engine_state).await;
    });

    // Ctrl-C triggers the same shutdown path as a QUIT message.
    let signal_state = Arc::clone(&state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_state.initiate_shutdown();
        }
    });

    serve(listener, Arc::clone(&state)).await;
    engine.await.ok();

    info!("gridwalk server stopped");
    Ok(())
}
