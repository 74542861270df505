//! candor-signal - Interview Signal Service
//!
//! Ingests transcribed interview chunks and maintains two live
//! signals, consistency and cultural fit, broadcast to observers
//! over SSE.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use tracing_subscriber::EnvFilter;

use candor_common::events::EventBus;
use candor_common::types::CompanyCultureValues;
use candor_signal::config::{Args, SignalConfig};
use candor_signal::oracle::HttpOracle;
use candor_signal::services::culture::load_culture_file;
use candor_signal::services::orchestrator::{run_session_task, SessionOrchestrator};
use candor_signal::services::ExtractionCadence;
use candor_signal::AppState;

/// Command queue depth; inbound chunks beyond this apply backpressure
const COMMAND_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting candor-signal (Interview Signal Service)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = SignalConfig::load(&args)?;

    // Culture data parameterizes the oracle's cultural-fit judgment.
    // An unreadable file is a setup failure; an unparseable one
    // degrades to no parameterization.
    let culture = match &config.culture_file {
        Some(path) => load_culture_file(path)?,
        None => {
            info!("No culture file configured; cultural-fit runs unparameterized");
            CompanyCultureValues::default()
        }
    };

    let oracle = Arc::new(HttpOracle::new(config.oracle.clone())?);
    info!(
        endpoint = %config.oracle.base_url,
        model = %config.oracle.model,
        "Judgment oracle configured"
    );

    let event_bus = EventBus::new(100);
    let orchestrator = SessionOrchestrator::new(
        oracle,
        event_bus.clone(),
        culture,
        ExtractionCadence::new(config.extraction_interval),
    );

    let snapshot = Arc::new(RwLock::new(orchestrator.snapshot()));
    let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    tokio::spawn(run_session_task(orchestrator, command_rx, snapshot.clone()));

    let state = AppState::new(commands, event_bus, snapshot);
    let app = candor_signal::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
