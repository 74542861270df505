//! candor-signal library interface
//!
//! Exposes the signal-computation pipeline and HTTP surface for
//! integration testing and embedding.

pub mod api;
pub mod config;
pub mod error;
pub mod oracle;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use candor_common::events::EventBus;

use crate::services::{SessionCommand, SessionSnapshot};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Command queue feeding the single session task
    pub commands: mpsc::Sender<SessionCommand>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Latest session snapshot, maintained by the session task
    pub snapshot: Arc<RwLock<SessionSnapshot>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        commands: mpsc::Sender<SessionCommand>,
        event_bus: EventBus,
        snapshot: Arc<RwLock<SessionSnapshot>>,
    ) -> Self {
        Self {
            commands,
            event_bus,
            snapshot,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::session_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
