//! Shared types for the interview signal pipeline
//!
//! Transcript chunks, contradictions, cultural-fit signals, and the
//! per-chunk score output broadcast to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a transcript chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    /// The interview candidate (the default for inbound chunks)
    #[default]
    Candidate,
    /// The interviewer
    Interviewer,
}

impl SpeakerRole {
    /// Display prefix used when rendering transcript context lines
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerRole::Candidate => "Candidate",
            SpeakerRole::Interviewer => "Interviewer",
        }
    }
}

/// One diarized utterance delivered by the transcription collaborator.
///
/// Immutable once delivered; the orchestrator clones it into the
/// rolling context and never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptChunk {
    /// Transcribed text (arbitrary length, no size limit enforced here)
    pub text: String,
    /// Speaker role
    #[serde(default)]
    pub speaker: SpeakerRole,
    /// Capture timestamp, if the collaborator supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TranscriptChunk {
    /// Render as a single transcript line, e.g. `Candidate: I led the team.`
    pub fn as_context_line(&self) -> String {
        format!("{}: {}", self.speaker.as_str(), self.text.trim())
    }
}

/// Contradiction severity, ordered from least to most damaging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Medium,
    Major,
    RedFlag,
}

impl Severity {
    /// Score penalty applied when folding this contradiction
    pub fn penalty(&self) -> u32 {
        match self {
            Severity::Minor => 2,
            Severity::Medium => 5,
            Severity::Major => 10,
            Severity::RedFlag => 25,
        }
    }
}

/// One detected contradiction
///
/// Ephemeral: produced during a chunk cycle, consumed by the score
/// fold, broadcast once, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    /// Severity of the contradiction
    pub severity: Severity,
    /// Human-readable description
    pub message: String,
    /// Fact field the contradiction concerns, when attributable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// One cultural-fit signal returned by the judgment oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CulturalSignal {
    /// Signal category, e.g. "ownership" or "blame-shift"
    pub category: String,
    /// Signed weight the oracle assigned (-5..=5, red flags to -10)
    pub weight: i8,
    /// Supporting quote or observation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

/// Per-chunk score output for one signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreOutput {
    /// Score in [0, 100]
    pub score: u8,
    /// Signed textual delta versus the previous score ("+3", "-2", "0")
    pub trend: String,
    /// Qualitative label for the current score band
    pub label: String,
}

/// Format the signed textual trend between two scores.
///
/// `"+N"` iff current > previous, `"-N"` iff current < previous,
/// exactly `"0"` iff equal.
pub fn format_trend(previous: u8, current: u8) -> String {
    let delta = current as i16 - previous as i16;
    if delta > 0 {
        format!("+{}", delta)
    } else {
        // A negative i16 renders with its minus sign; zero renders as "0"
        delta.to_string()
    }
}

/// Company culture description used to parameterize oracle instructions.
///
/// Loaded once at session setup, immutable, never re-parsed mid-session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyCultureValues {
    /// Company name, if the source text named one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    /// Ordered list of core values
    #[serde(default)]
    pub core_values: Vec<String>,
    /// Traits the company explicitly values
    #[serde(default)]
    pub positive_values: Vec<String>,
    /// Traits the company explicitly discourages
    #[serde(default)]
    pub negative_values: Vec<String>,
    /// The original source text, kept verbatim for observability
    #[serde(default)]
    pub raw_text: String,
}

impl CompanyCultureValues {
    /// Whether the parser recovered any usable values
    pub fn is_empty(&self) -> bool {
        self.core_values.is_empty()
            && self.positive_values.is_empty()
            && self.negative_values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_trend_signs() {
        assert_eq!(format_trend(50, 53), "+3");
        assert_eq!(format_trend(50, 48), "-2");
        assert_eq!(format_trend(50, 50), "0");
        assert_eq!(format_trend(0, 100), "+100");
        assert_eq!(format_trend(100, 0), "-100");
    }

    #[test]
    fn test_severity_penalties() {
        assert_eq!(Severity::Minor.penalty(), 2);
        assert_eq!(Severity::Medium.penalty(), 5);
        assert_eq!(Severity::Major.penalty(), 10);
        assert_eq!(Severity::RedFlag.penalty(), 25);
    }

    #[test]
    fn test_severity_wire_format() {
        let json = serde_json::to_string(&Severity::RedFlag).unwrap();
        assert_eq!(json, "\"red_flag\"");

        let parsed: Severity = serde_json::from_str("\"major\"").unwrap();
        assert_eq!(parsed, Severity::Major);
    }

    #[test]
    fn test_chunk_context_line() {
        let chunk = TranscriptChunk {
            text: "  I have five years of experience.  ".to_string(),
            speaker: SpeakerRole::Candidate,
            timestamp: None,
        };
        assert_eq!(
            chunk.as_context_line(),
            "Candidate: I have five years of experience."
        );
    }

    #[test]
    fn test_chunk_defaults_to_candidate() {
        let chunk: TranscriptChunk =
            serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(chunk.speaker, SpeakerRole::Candidate);
        assert!(chunk.timestamp.is_none());
    }

    #[test]
    fn test_contradiction_deserializes_without_field() {
        let c: Contradiction = serde_json::from_str(
            r#"{"severity":"minor","message":"timeline is vague"}"#,
        )
        .unwrap();
        assert_eq!(c.severity, Severity::Minor);
        assert!(c.field.is_none());
    }
}
