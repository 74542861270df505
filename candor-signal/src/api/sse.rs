//! SSE subscriber endpoint
//!
//! Streams `SignalEvent`s to every open observer connection. Delivery
//! is best effort: a lagged subscriber loses old events and keeps
//! receiving new ones; the next per-chunk update restores its view.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::AppState;

/// GET /events - SSE stream of signal updates
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        subscribers = state.event_bus.subscriber_count() + 1,
        "New SSE subscriber connected"
    );

    let rx = state.event_bus.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| async move {
        match result {
            Ok(signal_event) => Event::default()
                .event(signal_event.event_type())
                .json_data(&signal_event)
                .ok()
                .map(Ok),
            Err(e) => {
                // Lagged subscriber: skip, the next update catches it up
                warn!("SSE subscriber lagged: {:?}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keep-alive"),
    )
}
