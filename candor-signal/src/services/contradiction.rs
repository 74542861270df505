//! Contradiction scoring engine
//!
//! Maintains the consistency signal: a score starting at 100 that
//! loses points for every contradiction found during a chunk cycle.
//! The local scan checks the latest chunk against recent context via
//! the oracle; penalties are folded cumulatively and the score is
//! clamped to [0, 100].

use candor_common::types::{format_trend, Contradiction, ScoreOutput, TranscriptChunk};

use crate::oracle::{expect_shape, prompts, Oracle};

/// Initial contradiction score for a fresh session
pub const INITIAL_SCORE: u8 = 100;

/// Oracle response shape for the local scan
#[derive(Debug, serde::Deserialize)]
struct ScanResponse {
    #[serde(default)]
    contradictions: Vec<Contradiction>,
}

/// Qualitative label for a consistency score (lower bounds inclusive)
pub fn label_consistency(score: u8) -> &'static str {
    match score {
        75..=100 => "Consistent",
        50..=74 => "Some Inconsistencies",
        25..=49 => "High Risk",
        _ => "Severely Contradictory",
    }
}

/// Scan the latest chunk against recent context for self-contradiction.
///
/// Runs every chunk and never touches the persisted fact profile.
/// Oracle failure degrades to an empty result: the chunk still gets a
/// score output, unchanged.
pub async fn local_scan(
    oracle: &dyn Oracle,
    latest: &TranscriptChunk,
    recent_context: &str,
    previous_score: u8,
) -> Vec<Contradiction> {
    let payload = prompts::scan_payload(latest, recent_context, previous_score);
    let result = oracle
        .invoke(prompts::scan_instructions(), payload)
        .await
        .and_then(expect_shape::<ScanResponse>);

    match result {
        Ok(response) => response.contradictions,
        Err(e) => {
            tracing::warn!(error = %e, "Local contradiction scan failed; no penalty this chunk");
            Vec::new()
        }
    }
}

/// Fold a cycle's contradictions into the score.
///
/// Penalties are summed (no dedup across severities), subtracted from
/// the previous score, and clamped to [0, 100]. Zero contradictions
/// leaves the score unchanged but still produces an output.
pub fn compute_output(previous_score: u8, contradictions: &[Contradiction]) -> ScoreOutput {
    let total_penalty: i64 = contradictions
        .iter()
        .map(|c| c.severity.penalty() as i64)
        .sum();
    let score = (previous_score as i64 - total_penalty).clamp(0, 100) as u8;

    ScoreOutput {
        score,
        trend: format_trend(previous_score, score),
        label: label_consistency(score).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use async_trait::async_trait;
    use candor_common::types::{Severity, SpeakerRole};
    use serde_json::json;

    fn contradiction(severity: Severity) -> Contradiction {
        Contradiction {
            severity,
            message: "test".to_string(),
            field: None,
        }
    }

    #[test]
    fn test_single_major_penalty() {
        let output = compute_output(100, &[contradiction(Severity::Major)]);
        assert_eq!(output.score, 90);
        assert_eq!(output.trend, "-10");
        assert_eq!(output.label, "Consistent");
    }

    #[test]
    fn test_cumulative_penalties_in_one_cycle() {
        let output = compute_output(
            100,
            &[contradiction(Severity::Major), contradiction(Severity::RedFlag)],
        );
        assert_eq!(output.score, 65);
        assert_eq!(output.trend, "-35");
        assert_eq!(output.label, "Some Inconsistencies");
    }

    #[test]
    fn test_score_never_drops_below_zero() {
        let contradictions: Vec<Contradiction> =
            (0..10).map(|_| contradiction(Severity::RedFlag)).collect();
        let output = compute_output(30, &contradictions);
        assert_eq!(output.score, 0);
        assert_eq!(output.trend, "-30");
    }

    #[test]
    fn test_zero_contradictions_emits_unchanged_output() {
        let output = compute_output(82, &[]);
        assert_eq!(output.score, 82);
        assert_eq!(output.trend, "0");
        assert_eq!(output.label, "Consistent");
    }

    #[test]
    fn test_label_boundaries_inclusive_at_lower_bound() {
        assert_eq!(label_consistency(100), "Consistent");
        assert_eq!(label_consistency(75), "Consistent");
        assert_eq!(label_consistency(74), "Some Inconsistencies");
        assert_eq!(label_consistency(50), "Some Inconsistencies");
        assert_eq!(label_consistency(49), "High Risk");
        assert_eq!(label_consistency(25), "High Risk");
        assert_eq!(label_consistency(24), "Severely Contradictory");
        assert_eq!(label_consistency(0), "Severely Contradictory");
    }

    struct ScriptedOracle {
        response: Result<serde_json::Value, ()>,
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn invoke(
            &self,
            _instructions: &str,
            _payload: serde_json::Value,
        ) -> Result<serde_json::Value, OracleError> {
            self.response
                .clone()
                .map_err(|_| OracleError::Timeout)
        }
    }

    fn chunk(text: &str) -> TranscriptChunk {
        TranscriptChunk {
            text: text.to_string(),
            speaker: SpeakerRole::Candidate,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_local_scan_parses_contradictions() {
        let oracle = ScriptedOracle {
            response: Ok(json!({
                "contradictions": [
                    {"severity": "medium", "message": "dates disagree"}
                ]
            })),
        };
        let found = local_scan(&oracle, &chunk("I started in 2019."), "", 100).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Medium);
    }

    #[tokio::test]
    async fn test_local_scan_failure_degrades_to_empty() {
        let oracle = ScriptedOracle { response: Err(()) };
        let found = local_scan(&oracle, &chunk("anything"), "", 100).await;
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_local_scan_schema_mismatch_degrades_to_empty() {
        let oracle = ScriptedOracle {
            response: Ok(json!({"contradictions": "oops"})),
        };
        let found = local_scan(&oracle, &chunk("anything"), "", 100).await;
        assert!(found.is_empty());
    }
}
