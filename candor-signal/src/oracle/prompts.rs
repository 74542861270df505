//! Oracle instruction and payload builders
//!
//! Three judgment kinds are requested from the oracle: the per-chunk
//! local contradiction scan, the periodic fact extraction, and the
//! per-chunk cultural-fit read. Each gets fixed instructions naming
//! the exact JSON shape it must return; payloads carry the structured
//! inputs.

use candor_common::types::{CompanyCultureValues, TranscriptChunk};
use serde_json::{json, Value};

use crate::services::fact_store::FactProfile;

/// Maximum number of company core values woven into cultural-fit
/// instructions
pub const MAX_CORE_VALUES: usize = 4;

const SCAN_INSTRUCTIONS: &str = "\
You are auditing a live job interview for self-consistency. Compare the \
candidate's latest statement against the recent conversation context and \
report statements that contradict each other. Judge only what was said; \
do not speculate about facts outside the transcript.

Respond with a JSON object of this exact shape:
{\"contradictions\": [{\"severity\": \"minor|medium|major|red_flag\", \
\"message\": \"...\", \"field\": \"optional attribute name\"}]}

Severity guide: minor = hedging or small timeline fuzziness; medium = \
a clear inconsistency in details; major = an irreconcilable factual \
conflict; red_flag = an apparent fabrication. Return an empty list when \
the statement is consistent.";

const EXTRACTION_INSTRUCTIONS: &str = "\
You extract structured facts about a job candidate from an interview \
transcript excerpt. Fill only attributes the candidate actually stated; \
leave everything else out. Also report contradictions between the \
excerpt and the previously extracted profile you are given.

Respond with a JSON object of this exact shape:
{\"facts\": {\"years_experience\": number?, \"job_titles\": [string], \
\"companies\": [string], \"degrees\": [string], \"tech_stack\": [string], \
\"languages\": [string], \"leadership_experience\": [string]}, \
\"contradictions\": [{\"severity\": \"minor|medium|major|red_flag\", \
\"message\": \"...\", \"field\": \"optional attribute name\"}]}";

/// Instructions for the per-chunk local contradiction scan
pub fn scan_instructions() -> &'static str {
    SCAN_INSTRUCTIONS
}

/// Instructions for the periodic fact-extraction cycle
pub fn extraction_instructions() -> &'static str {
    EXTRACTION_INSTRUCTIONS
}

/// Instructions for the per-chunk cultural-fit evaluation.
///
/// Parameterized by up to [`MAX_CORE_VALUES`] company core values when
/// culture data is available.
pub fn cultural_fit_instructions(values: &CompanyCultureValues) -> String {
    let mut instructions = String::from(
        "You are reading a live job interview for cultural fit. Score the \
candidate's latest statement on a 0-100 scale starting from a neutral \
base of 50.\n\n\
Positive categories, weighted +1 to +5 each: ownership, accountability, \
curiosity, teamwork, humility, communication, growth, transparency.\n\
Negative categories, weighted -1 to -5 each: blame-shift, arrogance, \
avoidance, vagueness, contradiction, incuriosity, toxicity, \
excuse-making, values-mismatch.\n\
Red flags (discriminatory remarks, dishonesty, hostility) subtract at \
most 10 in total.\n",
    );

    let core: Vec<&str> = values
        .core_values
        .iter()
        .take(MAX_CORE_VALUES)
        .map(|v| v.as_str())
        .collect();
    if !core.is_empty() {
        instructions.push_str(&format!(
            "\nWeigh alignment with these company core values most heavily: {}.\n",
            core.join(", ")
        ));
    }
    if let Some(name) = &values.company_name {
        instructions.push_str(&format!("The hiring company is {}.\n", name));
    }

    instructions.push_str(
        "\nRespond with a JSON object of this exact shape:\n\
{\"cultural_score\": number, \"signals\": [{\"category\": \"...\", \
\"weight\": integer, \"evidence\": \"optional quote\"}]}",
    );
    instructions
}

/// Payload for the local contradiction scan.
///
/// `recent_context` excludes the chunk under scan.
pub fn scan_payload(latest: &TranscriptChunk, recent_context: &str, previous_score: u8) -> Value {
    json!({
        "latest_chunk": latest.as_context_line(),
        "recent_context": recent_context,
        "previous_score": previous_score,
    })
}

/// Payload for the fact-extraction cycle
pub fn extraction_payload(transcript_window: &str, previous_facts: &FactProfile) -> Value {
    json!({
        "transcript": transcript_window,
        "previous_facts": previous_facts,
    })
}

/// Payload for the cultural-fit evaluation
pub fn cultural_fit_payload(
    latest: &TranscriptChunk,
    history_summary: &str,
    previous_score: u8,
) -> Value {
    json!({
        "latest_chunk": latest.as_context_line(),
        "history_summary": history_summary,
        "previous_score": previous_score,
    })
}
