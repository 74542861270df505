//! Cultural fit scoring engine
//!
//! Asks the oracle for an instantaneous cultural read of the latest
//! chunk, then smooths it against the session history with an
//! exponential moving average so one noisy judgment cannot whipsaw
//! the signal, while a genuine shift still shows within a few chunks.

use candor_common::types::{
    format_trend, CompanyCultureValues, CulturalSignal, ScoreOutput, TranscriptChunk,
};

use crate::oracle::{expect_shape, prompts, Oracle};

/// Initial cultural-fit score for a fresh session (the neutral base)
pub const INITIAL_SCORE: u8 = 50;

/// Weight of the persisted score in the smoothing blend
const RETAIN_WEIGHT: f64 = 0.7;

/// Weight of the fresh instantaneous measurement
const INSTANT_WEIGHT: f64 = 0.3;

/// Oracle response shape for the cultural-fit evaluation.
///
/// The oracle may echo trend/label fields; they are ignored, since
/// trend and label are derived locally from the smoothed score.
#[derive(Debug, serde::Deserialize)]
struct CulturalResponse {
    cultural_score: f64,
    #[serde(default)]
    signals: Vec<CulturalSignal>,
}

/// Outcome of one cultural-fit evaluation cycle
#[derive(Debug, Clone)]
pub struct CulturalFitOutcome {
    /// Smoothed score, trend, and label
    pub output: ScoreOutput,
    /// Signals the oracle observed in this chunk
    pub signals: Vec<CulturalSignal>,
}

/// Qualitative label for a cultural-fit score (lower bounds inclusive)
pub fn label_fit(score: u8) -> &'static str {
    match score {
        75..=100 => "High Fit",
        50..=74 => "Moderate Fit",
        25..=49 => "Low Fit",
        _ => "At Risk",
    }
}

/// Exponential smoothing of the persisted score against a fresh
/// instantaneous measurement: `round(clamp(previous*0.7 + instant*0.3))`.
pub fn compute_new_score(previous: u8, instant: f64) -> u8 {
    let blended = previous as f64 * RETAIN_WEIGHT + instant * INSTANT_WEIGHT;
    blended.clamp(0.0, 100.0).round() as u8
}

/// Evaluate the latest chunk for cultural fit.
///
/// Oracle failure retains the previous score with trend "0"; the
/// session is never aborted by a failed evaluation.
pub async fn evaluate(
    oracle: &dyn Oracle,
    latest: &TranscriptChunk,
    history_summary: &str,
    previous_score: u8,
    values: &CompanyCultureValues,
) -> CulturalFitOutcome {
    let instructions = prompts::cultural_fit_instructions(values);
    let payload = prompts::cultural_fit_payload(latest, history_summary, previous_score);
    let result = oracle
        .invoke(&instructions, payload)
        .await
        .and_then(expect_shape::<CulturalResponse>);

    match result {
        Ok(response) => {
            let instant = response.cultural_score.clamp(0.0, 100.0);
            let score = compute_new_score(previous_score, instant);
            CulturalFitOutcome {
                output: ScoreOutput {
                    score,
                    trend: format_trend(previous_score, score),
                    label: label_fit(score).to_string(),
                },
                signals: response.signals,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Cultural fit evaluation failed; retaining previous score");
            CulturalFitOutcome {
                output: ScoreOutput {
                    score: previous_score,
                    trend: "0".to_string(),
                    label: label_fit(previous_score).to_string(),
                },
                signals: Vec::new(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use async_trait::async_trait;
    use candor_common::types::SpeakerRole;
    use serde_json::json;

    #[test]
    fn test_smoothing_formula() {
        // 50*0.7 + 80*0.3 = 59
        assert_eq!(compute_new_score(50, 80.0), 59);
        // 50*0.7 + 20*0.3 = 41
        assert_eq!(compute_new_score(50, 20.0), 41);
        // Rounding: 70*0.7 + 75*0.3 = 71.5 -> 72
        assert_eq!(compute_new_score(70, 75.0), 72);
    }

    #[test]
    fn test_smoothing_stays_in_bounds() {
        for previous in [0u8, 1, 50, 99, 100] {
            for instant in [0.0, 0.5, 50.0, 99.9, 100.0] {
                let score = compute_new_score(previous, instant);
                assert!(score <= 100);
                let expected =
                    (previous as f64 * 0.7 + instant * 0.3).round() as u8;
                assert_eq!(score, expected);
            }
        }
    }

    #[test]
    fn test_label_boundaries_inclusive_at_lower_bound() {
        assert_eq!(label_fit(75), "High Fit");
        assert_eq!(label_fit(74), "Moderate Fit");
        assert_eq!(label_fit(50), "Moderate Fit");
        assert_eq!(label_fit(49), "Low Fit");
        assert_eq!(label_fit(25), "Low Fit");
        assert_eq!(label_fit(24), "At Risk");
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
                .map_err(|_| OracleError::Network("scripted failure".to_string()))
        }
    }

    fn chunk() -> TranscriptChunk {
        TranscriptChunk {
            text: "I pushed back on my own estimate and owned the miss.".to_string(),
            speaker: SpeakerRole::Candidate,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn test_evaluate_smooths_oracle_score() {
        let oracle = ScriptedOracle {
            response: Ok(json!({
                "cultural_score": 80.0,
                "signals": [{"category": "ownership", "weight": 4}]
            })),
        };
        let outcome = evaluate(&oracle, &chunk(), "", 50, &CompanyCultureValues::default()).await;
        assert_eq!(outcome.output.score, 59);
        assert_eq!(outcome.output.trend, "+9");
        assert_eq!(outcome.output.label, "Moderate Fit");
        assert_eq!(outcome.signals.len(), 1);
        assert_eq!(outcome.signals[0].category, "ownership");
    }

    #[tokio::test]
    async fn test_evaluate_clamps_out_of_range_oracle_score() {
        let oracle = ScriptedOracle {
            response: Ok(json!({"cultural_score": 250.0, "signals": []})),
        };
        let outcome = evaluate(&oracle, &chunk(), "", 50, &CompanyCultureValues::default()).await;
        // clamp(250) = 100; 50*0.7 + 100*0.3 = 65
        assert_eq!(outcome.output.score, 65);
    }

    #[tokio::test]
    async fn test_evaluate_failure_retains_previous_score() {
        let oracle = ScriptedOracle { response: Err(()) };
        let outcome = evaluate(&oracle, &chunk(), "", 62, &CompanyCultureValues::default()).await;
        assert_eq!(outcome.output.score, 62);
        assert_eq!(outcome.output.trend, "0");
        assert_eq!(outcome.output.label, "Moderate Fit");
        assert!(outcome.signals.is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_schema_mismatch_retains_previous_score() {
        let oracle = ScriptedOracle {
            response: Ok(json!({"signals": []})),
        };
        let outcome = evaluate(&oracle, &chunk(), "", 50, &CompanyCultureValues::default()).await;
        assert_eq!(outcome.output.score, 50);
        assert_eq!(outcome.output.trend, "0");
    }
}
