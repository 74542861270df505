//! Session orchestrator and dispatcher
//!
//! Owns the per-session state (scores, rolling context, chunk counter,
//! fact store) and sequences each chunk through both scoring engines.
//! `process_chunk` is the sole entry point and sole writer of session
//! state; callers must invoke it sequentially. The service binary
//! guarantees that by funneling commands through an mpsc queue
//! consumed by a single task.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use candor_common::events::{EventBus, SignalEvent};
use candor_common::types::{CompanyCultureValues, ScoreOutput, SpeakerRole, TranscriptChunk};
use candor_common::{Error, Result};

use crate::oracle::Oracle;
use crate::services::fact_store::FactStore;
use crate::services::{contradiction, cultural_fit};

/// Rolling context capacity: the oracle's short-term memory
pub const CONTEXT_CAPACITY: usize = 12;

/// Maximum transcript lines handed to a fact-extraction cycle
pub const EXTRACTION_WINDOW: usize = 30;

/// When the periodic fact-extraction cycle fires.
///
/// Fires on chunk #1 (to seed the profile early) and then every
/// `interval`-th chunk: 1, 6, 12, 18, ... for the default interval.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionCadence {
    interval: u32,
}

impl ExtractionCadence {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval.max(1),
        }
    }

    /// Whether extraction runs for this 1-based chunk number
    pub fn should_run(&self, chunk_number: u32) -> bool {
        chunk_number == 1 || chunk_number % self.interval == 0
    }
}

impl Default for ExtractionCadence {
    fn default() -> Self {
        Self::new(6)
    }
}

/// Commands accepted by the session task
#[derive(Debug)]
pub enum SessionCommand {
    /// Process one transcript chunk
    Chunk(TranscriptChunk),
    /// Discard session state and start fresh
    Reset,
}

/// Read-only view of the session for the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub chunk_counter: u32,
    pub contradiction: ScoreOutput,
    pub cultural: ScoreOutput,
    pub oracle_failures: u64,
}

/// Per-session mutable state, owned exclusively by the orchestrator
struct SessionState {
    session_id: Uuid,
    contradiction_score: u8,
    cultural_score: u8,
    rolling_context: VecDeque<TranscriptChunk>,
    transcript_log: VecDeque<String>,
    chunk_counter: u32,
}

impl SessionState {
    fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            contradiction_score: contradiction::INITIAL_SCORE,
            cultural_score: cultural_fit::INITIAL_SCORE,
            rolling_context: VecDeque::with_capacity(CONTEXT_CAPACITY),
            transcript_log: VecDeque::with_capacity(EXTRACTION_WINDOW),
            chunk_counter: 0,
        }
    }

    /// Append a chunk with FIFO eviction at capacity
    fn push(&mut self, chunk: TranscriptChunk) {
        if self.rolling_context.len() == CONTEXT_CAPACITY {
            self.rolling_context.pop_front();
        }
        if self.transcript_log.len() == EXTRACTION_WINDOW {
            self.transcript_log.pop_front();
        }
        self.transcript_log.push_back(chunk.as_context_line());
        self.rolling_context.push_back(chunk);
    }

    /// Rolling context rendered as lines, excluding the latest chunk
    /// (the one currently under scan)
    fn context_excluding_latest(&self) -> String {
        let len = self.rolling_context.len();
        self.rolling_context
            .iter()
            .take(len.saturating_sub(1))
            .map(|c| c.as_context_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Transcript window handed to extraction cycles
    fn transcript_window(&self) -> String {
        self.transcript_log
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Session orchestrator: one per interview session
pub struct SessionOrchestrator {
    oracle: Arc<dyn Oracle>,
    event_bus: EventBus,
    culture: CompanyCultureValues,
    cadence: ExtractionCadence,
    fact_store: FactStore,
    state: SessionState,
}

impl SessionOrchestrator {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        event_bus: EventBus,
        culture: CompanyCultureValues,
        cadence: ExtractionCadence,
    ) -> Self {
        let state = SessionState::new();
        tracing::info!(session_id = %state.session_id, "Session orchestrator created");
        Self {
            oracle,
            event_bus,
            culture,
            cadence,
            fact_store: FactStore::new(),
            state,
        }
    }

    /// Process one transcript chunk through the full pipeline.
    ///
    /// 1. Reject blank input before touching state
    /// 2. Append to the rolling context (FIFO, capacity 12)
    /// 3. Local contradiction scan + cultural-fit evaluation, and the
    ///    fact-extraction cycle when the cadence fires; all run
    ///    concurrently and are awaited before any fold
    /// 4. Fold contradictions, smooth the cultural score
    /// 5. Increment the counter, broadcast both score outputs
    ///
    /// Interviewer chunks only extend the rolling context (so the
    /// oracle sees the question behind an answer); candidate speech is
    /// what drives the engines and the chunk counter.
    ///
    /// Oracle failures degrade individual signals; the only error this
    /// returns is rejection of a malformed (blank) chunk.
    pub async fn process_chunk(&mut self, chunk: TranscriptChunk) -> Result<()> {
        if chunk.text.trim().is_empty() {
            return Err(Error::InvalidInput("empty transcript chunk".to_string()));
        }

        if chunk.speaker == SpeakerRole::Interviewer {
            self.state.push(chunk);
            return Ok(());
        }

        let chunk_number = self.state.chunk_counter + 1;
        self.state.push(chunk.clone());

        let recent_context = self.state.context_excluding_latest();
        let transcript_window = self.state.transcript_window();
        let prev_contradiction = self.state.contradiction_score;
        let prev_cultural = self.state.cultural_score;

        let scan = contradiction::local_scan(
            self.oracle.as_ref(),
            &chunk,
            &recent_context,
            prev_contradiction,
        );
        let fit = cultural_fit::evaluate(
            self.oracle.as_ref(),
            &chunk,
            &recent_context,
            prev_cultural,
            &self.culture,
        );

        let (mut cycle_contradictions, fit_outcome) = if self.cadence.should_run(chunk_number) {
            tracing::debug!(chunk = chunk_number, "Extraction cycle firing");
            let extraction = self
                .fact_store
                .run_extraction_cycle(self.oracle.as_ref(), &transcript_window);
            let (mut scan_found, fit_outcome, extracted) = tokio::join!(scan, fit, extraction);
            scan_found.extend(extracted);
            (scan_found, fit_outcome)
        } else {
            let (scan_found, fit_outcome) = tokio::join!(scan, fit);
            (scan_found, fit_outcome)
        };

        let contradiction_output =
            contradiction::compute_output(prev_contradiction, &cycle_contradictions);

        self.state.contradiction_score = contradiction_output.score;
        self.state.cultural_score = fit_outcome.output.score;
        self.state.chunk_counter = chunk_number;

        tracing::debug!(
            session_id = %self.state.session_id,
            chunk = chunk_number,
            contradiction_score = contradiction_output.score,
            cultural_score = fit_outcome.output.score,
            contradictions = cycle_contradictions.len(),
            "Chunk processed"
        );

        let timestamp = Utc::now();
        self.event_bus.emit_lossy(SignalEvent::ContradictionUpdate {
            score: contradiction_output.score,
            trend: contradiction_output.trend,
            label: contradiction_output.label,
            contradictions: std::mem::take(&mut cycle_contradictions),
            timestamp,
        });
        self.event_bus.emit_lossy(SignalEvent::CulturalFitUpdate {
            score: fit_outcome.output.score,
            trend: fit_outcome.output.trend,
            label: fit_outcome.output.label,
            signals: fit_outcome.signals,
            timestamp,
        });

        Ok(())
    }

    /// Discard all session state and start a fresh session.
    ///
    /// Scores return to 100/50, the rolling context and chunk counter
    /// clear, and the fact store empties.
    pub fn reset(&mut self) {
        let old_id = self.state.session_id;
        self.state = SessionState::new();
        self.fact_store.reset();
        tracing::info!(
            old_session_id = %old_id,
            session_id = %self.state.session_id,
            "Session reset"
        );
        self.event_bus.emit_lossy(SignalEvent::SessionReset {
            session_id: self.state.session_id,
            timestamp: Utc::now(),
        });
    }

    /// Read-only snapshot for the status endpoint
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.state.session_id,
            chunk_counter: self.state.chunk_counter,
            contradiction: ScoreOutput {
                score: self.state.contradiction_score,
                trend: "0".to_string(),
                label: contradiction::label_consistency(self.state.contradiction_score)
                    .to_string(),
            },
            cultural: ScoreOutput {
                score: self.state.cultural_score,
                trend: "0".to_string(),
                label: cultural_fit::label_fit(self.state.cultural_score).to_string(),
            },
            oracle_failures: self.fact_store.oracle_failures(),
        }
    }
}

/// Drive a session orchestrator from a command queue.
///
/// A single consumer task serializes all state mutation; inbound HTTP
/// handlers only enqueue. Runs until every sender is dropped.
pub async fn run_session_task(
    mut orchestrator: SessionOrchestrator,
    mut commands: mpsc::Receiver<SessionCommand>,
    snapshot: Arc<RwLock<SessionSnapshot>>,
) {
    while let Some(command) = commands.recv().await {
        match command {
            SessionCommand::Chunk(chunk) => {
                if let Err(e) = orchestrator.process_chunk(chunk).await {
                    tracing::warn!(error = %e, "Chunk rejected");
                }
            }
            SessionCommand::Reset => orchestrator.reset(),
        }
        *snapshot.write().await = orchestrator.snapshot();
    }
    tracing::info!("Session task stopped: command channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use async_trait::async_trait;
    use candor_common::types::SpeakerRole;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Records every invocation, keyed by payload shape, and answers
    /// with neutral responses (or scripted failure).
    #[derive(Default)]
    struct RecordingOracle {
        scan_payloads: Mutex<Vec<Value>>,
        extraction_payloads: Mutex<Vec<Value>>,
        fit_payloads: Mutex<Vec<Value>>,
        fail_all: bool,
    }

    #[async_trait]
    impl Oracle for RecordingOracle {
        async fn invoke(
            &self,
            _instructions: &str,
            payload: Value,
        ) -> std::result::Result<Value, OracleError> {
            let response = if payload.get("recent_context").is_some() {
                self.scan_payloads.lock().unwrap().push(payload);
                json!({"contradictions": []})
            } else if payload.get("transcript").is_some() {
                self.extraction_payloads.lock().unwrap().push(payload);
                json!({"facts": {}, "contradictions": []})
            } else {
                self.fit_payloads.lock().unwrap().push(payload);
                json!({"cultural_score": 50.0, "signals": []})
            };

            if self.fail_all {
                Err(OracleError::Timeout)
            } else {
                Ok(response)
            }
        }
    }

    fn chunk(text: &str) -> TranscriptChunk {
        TranscriptChunk {
            text: text.to_string(),
            speaker: SpeakerRole::Candidate,
            timestamp: None,
        }
    }

    fn orchestrator(oracle: Arc<RecordingOracle>) -> (SessionOrchestrator, EventBus) {
        let bus = EventBus::new(256);
        let orch = SessionOrchestrator::new(
            oracle,
            bus.clone(),
            CompanyCultureValues::default(),
            ExtractionCadence::default(),
        );
        (orch, bus)
    }

    #[test]
    fn test_cadence_fires_on_one_and_multiples_of_six() {
        let cadence = ExtractionCadence::default();
        let firing: Vec<u32> = (1..=20).filter(|n| cadence.should_run(*n)).collect();
        assert_eq!(firing, vec![1, 6, 12, 18]);
    }

    #[test]
    fn test_cadence_interval_floor() {
        // Interval 0 would fire every chunk by division; clamp to 1
        let cadence = ExtractionCadence::new(0);
        assert!(cadence.should_run(1));
        assert!(cadence.should_run(2));
    }

    #[tokio::test]
    async fn test_blank_chunk_rejected_without_state_change() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, _bus) = orchestrator(oracle.clone());

        let result = orch.process_chunk(chunk("   ")).await;
        assert!(result.is_err());
        assert_eq!(orch.snapshot().chunk_counter, 0);
        assert!(oracle.scan_payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fresh_session_scores() {
        let oracle = Arc::new(RecordingOracle::default());
        let (orch, _bus) = orchestrator(oracle);
        let snapshot = orch.snapshot();
        assert_eq!(snapshot.contradiction.score, 100);
        assert_eq!(snapshot.cultural.score, 50);
        assert_eq!(snapshot.chunk_counter, 0);
    }

    #[tokio::test]
    async fn test_every_chunk_broadcasts_both_signals() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, bus) = orchestrator(oracle);
        let mut rx = bus.subscribe();

        orch.process_chunk(chunk("I write Rust.")).await.unwrap();

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert_eq!(first.event_type(), "contradiction_update");
        assert_eq!(second.event_type(), "cultural_fit_update");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_interviewer_chunk_extends_context_without_scoring() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, bus) = orchestrator(oracle.clone());
        let mut rx = bus.subscribe();

        let question = TranscriptChunk {
            text: "How long have you worked with Rust?".to_string(),
            speaker: SpeakerRole::Interviewer,
            timestamp: None,
        };
        orch.process_chunk(question).await.unwrap();

        // No scoring cycle, no counter movement, no broadcast
        assert_eq!(orch.snapshot().chunk_counter, 0);
        assert!(oracle.scan_payloads.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());

        // The question shows up in the next candidate scan's context
        orch.process_chunk(chunk("About four years.")).await.unwrap();
        let scans = oracle.scan_payloads.lock().unwrap();
        let context = scans[0]["recent_context"].as_str().unwrap();
        assert!(context.contains("Interviewer: How long have you worked with Rust?"));
    }

    #[tokio::test]
    async fn test_extraction_fires_on_chunks_one_and_six_only() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, _bus) = orchestrator(oracle.clone());

        for i in 1..=7 {
            orch.process_chunk(chunk(&format!("statement {}", i)))
                .await
                .unwrap();
        }

        let extractions = oracle.extraction_payloads.lock().unwrap();
        assert_eq!(extractions.len(), 2, "chunks 1 and 6 only");
    }

    #[tokio::test]
    async fn test_scan_context_excludes_current_chunk() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, _bus) = orchestrator(oracle.clone());

        orch.process_chunk(chunk("first statement")).await.unwrap();
        orch.process_chunk(chunk("second statement")).await.unwrap();

        let scans = oracle.scan_payloads.lock().unwrap();
        let context_first = scans[0]["recent_context"].as_str().unwrap();
        assert!(context_first.is_empty());
        let context_second = scans[1]["recent_context"].as_str().unwrap();
        assert!(context_second.contains("first statement"));
        assert!(!context_second.contains("second statement"));
    }

    #[tokio::test]
    async fn test_rolling_context_evicts_oldest_after_capacity() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, _bus) = orchestrator(oracle.clone());

        for i in 1..=13 {
            orch.process_chunk(chunk(&format!("statement number {}", i)))
                .await
                .unwrap();
        }

        let scans = oracle.scan_payloads.lock().unwrap();
        let context_13 = scans[12]["recent_context"].as_str().unwrap();
        assert!(
            !context_13.contains("statement number 1\n")
                && !context_13.starts_with("Candidate: statement number 1"),
            "chunk #1 must be evicted by scan #13"
        );
        assert!(context_13.contains("statement number 2"));
        assert!(context_13.contains("statement number 12"));
        // 12-capacity buffer minus the current chunk
        assert_eq!(context_13.lines().count(), 11);
    }

    #[tokio::test]
    async fn test_oracle_failure_still_emits_unchanged_output() {
        let oracle = Arc::new(RecordingOracle {
            fail_all: true,
            ..Default::default()
        });
        let (mut orch, bus) = orchestrator(oracle);
        let mut rx = bus.subscribe();

        orch.process_chunk(chunk("anything")).await.unwrap();

        match rx.try_recv().unwrap() {
            SignalEvent::ContradictionUpdate { score, trend, .. } => {
                assert_eq!(score, 100);
                assert_eq!(trend, "0");
            }
            other => panic!("wrong event: {}", other.event_type()),
        }
        match rx.try_recv().unwrap() {
            SignalEvent::CulturalFitUpdate { score, trend, .. } => {
                assert_eq!(score, 50);
                assert_eq!(trend, "0");
            }
            other => panic!("wrong event: {}", other.event_type()),
        }
    }

    #[tokio::test]
    async fn test_reset_reinitializes_state_and_broadcasts() {
        let oracle = Arc::new(RecordingOracle::default());
        let (mut orch, bus) = orchestrator(oracle);

        for i in 1..=3 {
            orch.process_chunk(chunk(&format!("statement {}", i)))
                .await
                .unwrap();
        }
        let before = orch.snapshot();
        assert_eq!(before.chunk_counter, 3);

        let mut rx = bus.subscribe();
        orch.reset();

        let after = orch.snapshot();
        assert_eq!(after.chunk_counter, 0);
        assert_eq!(after.contradiction.score, 100);
        assert_eq!(after.cultural.score, 50);
        assert_ne!(after.session_id, before.session_id);
        assert_eq!(rx.try_recv().unwrap().event_type(), "session_reset");
    }

    #[tokio::test]
    async fn test_session_task_serializes_commands() {
        let oracle = Arc::new(RecordingOracle::default());
        let (orch, _bus) = orchestrator(oracle.clone());
        let snapshot = Arc::new(RwLock::new(orch.snapshot()));
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(run_session_task(orch, rx, snapshot.clone()));

        for i in 1..=4 {
            tx.send(SessionCommand::Chunk(chunk(&format!("statement {}", i))))
                .await
                .unwrap();
        }
        tx.send(SessionCommand::Reset).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let view = snapshot.read().await;
        assert_eq!(view.chunk_counter, 0);
        assert_eq!(view.contradiction.score, 100);
        assert_eq!(oracle.scan_payloads.lock().unwrap().len(), 4);
    }
}
