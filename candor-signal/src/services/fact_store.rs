//! Fact store and merge engine
//!
//! Per-session record of the candidate's claimed background: one
//! scalar (total years of experience) plus de-duplicated string sets.
//! Extraction asks the oracle for new facts over a transcript window;
//! merging folds them into the profile with recency-wins scalars and
//! case-insensitive set union; a deterministic cross-check compares
//! profiles without consulting the oracle.
//!
//! Failure isolation: an oracle failure during extraction never
//! propagates; the prior profile persists unchanged and the cycle
//! reports no contradictions.

use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use candor_common::types::{Contradiction, Severity};

use crate::oracle::{expect_shape, prompts, Oracle};

/// Similarity at or above which two set entries are treated as the
/// same claim ("Acme Corp" vs "Acme Corp.")
const NEAR_DUPLICATE_THRESHOLD: f64 = 0.92;

/// Scalar changes smaller than this are corroboration, not conflict
const YEARS_TOLERANCE: f64 = 0.5;

/// Accumulated structured understanding of the candidate's claimed
/// background.
///
/// Invariant: no set contains two entries that are equal
/// case-insensitively (or near-duplicates per [`NEAR_DUPLICATE_THRESHOLD`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FactProfile {
    /// Claimed total years of experience (most recently confirmed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_experience: Option<f64>,
    /// Set when the scalar was overridden without corroboration
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub years_experience_conflicted: bool,
    /// Job titles the candidate has held
    #[serde(default)]
    pub job_titles: Vec<String>,
    /// Companies the candidate has worked for
    #[serde(default)]
    pub companies: Vec<String>,
    /// Degrees and certifications
    #[serde(default)]
    pub degrees: Vec<String>,
    /// Technologies and tools
    #[serde(default)]
    pub tech_stack: Vec<String>,
    /// Spoken/written languages
    #[serde(default)]
    pub languages: Vec<String>,
    /// Leadership roles or claims
    #[serde(default)]
    pub leadership_experience: Vec<String>,
}

impl FactProfile {
    /// Whether anything has been extracted yet
    pub fn is_empty(&self) -> bool {
        self.years_experience.is_none()
            && self.job_titles.is_empty()
            && self.companies.is_empty()
            && self.degrees.is_empty()
            && self.tech_stack.is_empty()
            && self.languages.is_empty()
            && self.leadership_experience.is_empty()
    }
}

/// Result of merging an incoming profile into the previous one
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged profile
    pub merged: FactProfile,
    /// Conflicts detected during the merge (fed to the score fold)
    pub conflicts: Vec<Contradiction>,
}

/// Oracle response shape for fact extraction
#[derive(Debug, Deserialize)]
struct ExtractionResponse {
    #[serde(default)]
    facts: FactProfile,
    #[serde(default)]
    contradictions: Vec<Contradiction>,
}

fn same_claim(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    a == b || jaro_winkler(&a, &b) >= NEAR_DUPLICATE_THRESHOLD
}

/// Union two fact sets, de-duplicated case-insensitively with
/// near-duplicate suppression. Existing entries keep their original
/// spelling.
fn union_set(previous: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = previous.to_vec();
    for item in incoming {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !merged.iter().any(|existing| same_claim(existing, trimmed)) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}

/// Merge an incoming profile into the previous one.
///
/// Scalars: the incoming value overrides the previous one; an
/// uncorroborated change beyond tolerance emits a conflict and flags
/// the field, but the newest value still wins (recency wins, no
/// voting). Sets: case-insensitive union.
pub fn merge_facts(previous: &FactProfile, incoming: &FactProfile) -> MergeOutcome {
    let mut conflicts = Vec::new();

    let (years, conflicted) = match (previous.years_experience, incoming.years_experience) {
        (Some(old), Some(new)) if (old - new).abs() > YEARS_TOLERANCE => {
            conflicts.push(Contradiction {
                severity: Severity::Medium,
                message: format!(
                    "claimed years of experience changed from {} to {} without corroboration",
                    old, new
                ),
                field: Some("years_experience".to_string()),
            });
            (Some(new), true)
        }
        (old, new) => (new.or(old), previous.years_experience_conflicted),
    };

    MergeOutcome {
        merged: FactProfile {
            years_experience: years,
            years_experience_conflicted: conflicted,
            job_titles: union_set(&previous.job_titles, &incoming.job_titles),
            companies: union_set(&previous.companies, &incoming.companies),
            degrees: union_set(&previous.degrees, &incoming.degrees),
            tech_stack: union_set(&previous.tech_stack, &incoming.tech_stack),
            languages: union_set(&previous.languages, &incoming.languages),
            leadership_experience: union_set(
                &previous.leadership_experience,
                &incoming.leadership_experience,
            ),
        },
        conflicts,
    }
}

/// Deterministic, oracle-independent cross-check between the previous
/// profile and a freshly extracted one.
pub fn compare_profiles(previous: &FactProfile, incoming: &FactProfile) -> Vec<Contradiction> {
    let mut contradictions = Vec::new();

    if let (Some(old), Some(new)) = (previous.years_experience, incoming.years_experience) {
        if new + 1.0 < old {
            contradictions.push(Contradiction {
                severity: Severity::Major,
                message: format!(
                    "stated total experience dropped from {} to {} years",
                    old, new
                ),
                field: Some("years_experience".to_string()),
            });
        } else if new > old + 10.0 {
            contradictions.push(Contradiction {
                severity: Severity::Medium,
                message: format!(
                    "stated total experience jumped from {} to {} years",
                    old, new
                ),
                field: Some("years_experience".to_string()),
            });
        }
    }

    // A stack of titles does not fit inside a sub-year career
    if let Some(years) = incoming.years_experience {
        if years < 1.0 && incoming.job_titles.len() >= 4 {
            contradictions.push(Contradiction {
                severity: Severity::Minor,
                message: format!(
                    "{} distinct job titles claimed against under a year of experience",
                    incoming.job_titles.len()
                ),
                field: Some("job_titles".to_string()),
            });
        }
    }

    contradictions
}

/// Per-session fact store.
///
/// `profile()` reads, `update()` and `reset()` are the only mutation
/// points; everything else treats the store read-only.
#[derive(Debug, Default)]
pub struct FactStore {
    profile: FactProfile,
    oracle_failures: u64,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current profile (read-only)
    pub fn profile(&self) -> &FactProfile {
        &self.profile
    }

    /// Replace the profile with a merged result
    pub fn update(&mut self, profile: FactProfile) {
        self.profile = profile;
    }

    /// Clear the profile for a fresh session
    pub fn reset(&mut self) {
        self.profile = FactProfile::default();
        self.oracle_failures = 0;
    }

    /// Extraction failures observed so far (for observability)
    pub fn oracle_failures(&self) -> u64 {
        self.oracle_failures
    }

    /// Ask the oracle for facts over a transcript window.
    ///
    /// Malformed or failed oracle output yields empty facts and no
    /// contradictions; the failure is counted and logged, never
    /// propagated.
    pub async fn extract_facts(
        &mut self,
        oracle: &dyn Oracle,
        transcript_window: &str,
    ) -> (FactProfile, Vec<Contradiction>) {
        let payload = prompts::extraction_payload(transcript_window, &self.profile);
        let result = oracle
            .invoke(prompts::extraction_instructions(), payload)
            .await
            .and_then(expect_shape::<ExtractionResponse>);

        match result {
            Ok(response) => (response.facts, response.contradictions),
            Err(e) => {
                self.oracle_failures += 1;
                tracing::warn!(
                    error = %e,
                    failures = self.oracle_failures,
                    "Fact extraction failed; keeping prior profile"
                );
                (FactProfile::default(), Vec::new())
            }
        }
    }

    /// Run a full extraction cycle: extract, merge, cross-check,
    /// commit. Returns every contradiction the cycle produced.
    pub async fn run_extraction_cycle(
        &mut self,
        oracle: &dyn Oracle,
        transcript_window: &str,
    ) -> Vec<Contradiction> {
        let (incoming, mut contradictions) =
            self.extract_facts(oracle, transcript_window).await;
        if incoming.is_empty() {
            return contradictions;
        }

        let previous = self.profile.clone();
        let MergeOutcome { merged, conflicts } = merge_facts(&previous, &incoming);
        contradictions.extend(conflicts);
        contradictions.extend(compare_profiles(&previous, &incoming));

        tracing::debug!(
            titles = merged.job_titles.len(),
            companies = merged.companies.len(),
            contradictions = contradictions.len(),
            "Fact profile merged"
        );
        self.update(merged);
        contradictions
    }
}
