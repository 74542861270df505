//! Event types and EventBus for the signal pipeline
//!
//! `SignalEvent` is the wire format fanned out to subscribers; the
//! `EventBus` wraps `tokio::sync::broadcast` so one slow subscriber
//! never blocks delivery to the others.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::types::{Contradiction, CulturalSignal};

/// Events broadcast to observers of a live interview session.
///
/// Serialized adjacently tagged, so subscribers see
/// `{"type": "contradiction_update", "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SignalEvent {
    /// Contradiction/consistency score recomputed for a chunk.
    ///
    /// Emitted every chunk, even when no contradictions were found
    /// and the score is unchanged.
    ContradictionUpdate {
        /// Current contradiction score [0, 100]
        score: u8,
        /// Signed delta versus the previous chunk
        trend: String,
        /// Qualitative label for the score band
        label: String,
        /// Contradictions detected during this cycle
        contradictions: Vec<Contradiction>,
        /// When the update was computed
        timestamp: DateTime<Utc>,
    },

    /// Cultural-fit score recomputed for a chunk
    CulturalFitUpdate {
        /// Current smoothed cultural-fit score [0, 100]
        score: u8,
        /// Signed delta versus the previous chunk
        trend: String,
        /// Qualitative label for the score band
        label: String,
        /// Signals the oracle observed in this chunk
        signals: Vec<CulturalSignal>,
        /// When the update was computed
        timestamp: DateTime<Utc>,
    },

    /// Session state was reset; scores reinitialized to 100/50
    SessionReset {
        /// Identifier of the fresh session
        session_id: Uuid,
        /// When the reset happened
        timestamp: DateTime<Utc>,
    },
}

impl SignalEvent {
    /// Event type as a string, for SSE event names and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SignalEvent::ContradictionUpdate { .. } => "contradiction_update",
            SignalEvent::CulturalFitUpdate { .. } => "cultural_fit_update",
            SignalEvent::SessionReset { .. } => "session_reset",
        }
    }
}

/// Central event distribution bus for session signal updates.
///
/// Backed by `tokio::broadcast`: non-blocking publish, multiple
/// concurrent subscribers, automatic cleanup when subscribers drop.
/// Delivery is best effort; lagged subscribers lose the oldest events
/// rather than stalling the orchestrator.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SignalEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SignalEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber
    /// exists, `Err` otherwise.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SignalEvent,
    ) -> Result<usize, broadcast::error::SendError<SignalEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// Score updates are rebroadcast every chunk, so a missed event
    /// is recovered by the next cycle.
    pub fn emit_lossy(&self, event: SignalEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
