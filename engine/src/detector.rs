//! Acceptance detection for offered completions.
//!
//! The host editor gives no direct "suggestion accepted" signal, so
//! acceptance is inferred: while an offer is live, each buffer mutation is
//! tested against the pending candidates with an ordered heuristic rule
//! list (trimmed-exact, containment both ways, prefix overlap). The rules
//! live in [`match_inserted`] so the behavior is deterministic and testable
//! without an editor.
//!
//! State machine: `Idle → AwaitingResponse → Offering → {accepted, expired,
//! superseded} → Idle`. Every transition out of `Offering` clears the pending
//! context, so a late buffer mutation or a late dwell timer can never fire a
//! second acceptance for the same context.

use std::time::Duration;

use fimpad_protocol::CandidateSet;
use fimpad_protocol::FimPrompt;

/// How long an offered candidate set stays eligible for acceptance.
pub const DWELL_TIMEOUT: Duration = Duration::from_secs(5);

/// How long the accepted-span highlight stays visible.
pub const HIGHLIGHT_CLEAR_AFTER: Duration = Duration::from_secs(15);

// Thresholds for the prefix-overlap rule.
const OVERLAP_MIN_CANDIDATE_CHARS: usize = 10;
const OVERLAP_MIN_INSERTED_CHARS: usize = 5;
const OVERLAP_WINDOW_CHARS: usize = 50;

/// The single in-flight offer. At most one exists per session; a new trigger
/// silently replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCompletionContext {
    pub generation: u64,
    pub prompt: FimPrompt,
    pub candidates: CandidateSet,
    pub cursor_offset_at_request: usize,
}

#[derive(Debug, Default)]
pub enum DetectorState {
    #[default]
    Idle,
    AwaitingResponse {
        generation: u64,
    },
    Offering(PendingCompletionContext),
}

/// An inferred acceptance: which candidate matched and the synthesized final
/// FIM text (prompt with the middle span filled by the inserted text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceptance {
    pub candidate_index: usize,
    pub accepted_text: String,
    pub original_prompt: FimPrompt,
    pub final_fim_text: String,
}

#[derive(Debug, Default)]
pub struct AcceptanceDetector {
    state: DetectorState,
}

impl AcceptanceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DetectorState::Idle)
    }

    /// A trigger chord fired. Supersedes any outstanding request or offer
    /// without emitting anything for it.
    pub fn on_trigger(&mut self, generation: u64) {
        self.state = DetectorState::AwaitingResponse { generation };
    }

    /// Completion-client failure or empty candidate set: nothing to offer.
    pub fn reset(&mut self) {
        self.state = DetectorState::Idle;
    }

    /// A completion response arrived. Installs the offer and returns `true`
    /// only when the response matches the generation we are still waiting
    /// for; stale responses are dropped without touching state.
    pub fn on_response(
        &mut self,
        generation: u64,
        prompt: FimPrompt,
        candidates: CandidateSet,
        cursor_offset_at_request: usize,
    ) -> bool {
        let DetectorState::AwaitingResponse {
            generation: current,
        } = &self.state
        else {
            return false;
        };
        if *current != generation {
            return false;
        }
        if candidates.is_empty() {
            self.state = DetectorState::Idle;
            return false;
        }
        self.state = DetectorState::Offering(PendingCompletionContext {
            generation,
            prompt,
            candidates,
            cursor_offset_at_request,
        });
        true
    }

    /// Test a buffer mutation against the live offer. On a match the context
    /// is cleared and the acceptance returned; otherwise state is unchanged
    /// (the user may still be typing toward a candidate).
    pub fn on_buffer_mutated(&mut self, inserted_text: &str) -> Option<Acceptance> {
        let DetectorState::Offering(context) = &self.state else {
            return None;
        };
        let candidate_index = match_inserted(inserted_text, &context.candidates)?;
        let acceptance = Acceptance {
            candidate_index,
            accepted_text: inserted_text.to_string(),
            original_prompt: context.prompt.clone(),
            final_fim_text: context.prompt.splice(inserted_text),
        };
        self.state = DetectorState::Idle;
        Some(acceptance)
    }

    /// The dwell timer for `generation` elapsed. Clears the offer silently
    /// and returns `true` only when that exact offer is still live; a timer
    /// outliving its context is a no-op.
    pub fn on_dwell_expired(&mut self, generation: u64) -> bool {
        match &self.state {
            DetectorState::Offering(context) if context.generation == generation => {
                self.state = DetectorState::Idle;
                true
            }
            _ => false,
        }
    }
}

/// Match inserted text against the candidates, first matching candidate (by
/// index) wins. Rules per candidate, on trimmed text: exact, inserted
/// contains candidate, candidate contains inserted, prefix overlap for
/// sufficiently long strings.
pub fn match_inserted(inserted_text: &str, candidates: &CandidateSet) -> Option<usize> {
    let inserted = inserted_text.trim();
    if inserted.is_empty() {
        // A whitespace-only mutation would trivially satisfy containment for
        // every candidate; it can never be an acceptance.
        return None;
    }
    candidates.iter().position(|candidate| {
        let candidate = candidate.trim();
        candidate == inserted
            || inserted.contains(candidate)
            || candidate.contains(inserted)
            || prefix_overlap(candidate, inserted)
    })
}

/// Compare the leading characters of both strings, each truncated to
/// `min(50, other's length)` characters. Only applies when the candidate
/// exceeds 10 characters and the inserted text exceeds 5.
fn prefix_overlap(candidate: &str, inserted: &str) -> bool {
    let candidate_chars = candidate.chars().count();
    let inserted_chars = inserted.chars().count();
    if candidate_chars <= OVERLAP_MIN_CANDIDATE_CHARS
        || inserted_chars <= OVERLAP_MIN_INSERTED_CHARS
    {
        return false;
    }
    let candidate_head: String = candidate
        .chars()
        .take(OVERLAP_WINDOW_CHARS.min(inserted_chars))
        .collect();
    let inserted_head: String = inserted
        .chars()
        .take(OVERLAP_WINDOW_CHARS.min(candidate_chars))
        .collect();
    candidate_head == inserted_head
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn candidates(raw: &[&str]) -> CandidateSet {
        CandidateSet::from_raw(raw.iter().map(|s| (*s).to_string()))
    }

    fn offering(detector: &mut AcceptanceDetector, generation: u64, raw: &[&str]) {
        detector.on_trigger(generation);
        let installed = detector.on_response(
            generation,
            FimPrompt::frame("before|after", 6),
            candidates(raw),
            6,
        );
        assert!(installed);
    }

    #[test]
    fn exact_match_after_trimming() {
        let set = candidates(&["foo();", "bar();"]);
        assert_eq!(match_inserted("  bar();\n", &set), Some(1));
    }

    #[test]
    fn inserted_containing_candidate_matches() {
        let set = candidates(&["foo();"]);
        assert_eq!(match_inserted("prefix foo(); suffix", &set), Some(0));
    }

    #[test]
    fn candidate_containing_inserted_matches() {
        let set = candidates(&["let area = Math.PI * r * r;"]);
        assert_eq!(match_inserted("Math.PI", &set), Some(0));
    }

    #[test]
    fn first_candidate_wins_ties() {
        let set = candidates(&["shared text", "shared text here"]);
        assert_eq!(match_inserted("shared text", &set), Some(0));
    }

    #[test]
    fn prefix_overlap_requires_minimum_lengths() {
        // Candidate 11 chars, inserted 6 chars sharing the head but not
        // contained in each other.
        let set = candidates(&["abcdefghijX"]);
        assert_eq!(match_inserted("abcdefZ", &set), None);
        // Diverging tails within the compared window reject the match.
        let set = candidates(&["abcdefghijklmnop"]);
        assert_eq!(match_inserted("abcdefghijklmnXY", &set), None);
    }

    #[test]
    fn prefix_overlap_compares_heads_of_equal_length() {
        // Neither contains the other once the tails diverge past the window,
        // but the first 50 chars agree.
        let head = "a".repeat(50);
        let candidate = format!("{head}CANDIDATE");
        let set = candidates(&[candidate.as_str()]);
        assert_eq!(match_inserted(&format!("{head}INSERTED"), &set), Some(0));
    }

    #[test]
    fn whitespace_only_insertion_never_matches() {
        let set = candidates(&["anything"]);
        assert_eq!(match_inserted("   \n", &set), None);
        assert_eq!(match_inserted("", &set), None);
    }

    #[test]
    fn acceptance_splices_and_clears_context() {
        let mut detector = AcceptanceDetector::new();
        offering(&mut detector, 1, &["filled();"]);

        let acceptance = detector
            .on_buffer_mutated("filled();")
            .expect("acceptance");
        assert_eq!(acceptance.candidate_index, 0);
        assert_eq!(acceptance.accepted_text, "filled();");
        assert_eq!(
            acceptance.final_fim_text,
            "<fim_prefix>before<fim_suffix>|after<fim_middle>filled();"
        );

        // Idempotence: the context is gone, a second mutation matches nothing.
        assert!(detector.is_idle());
        assert_eq!(detector.on_buffer_mutated("filled();"), None);
    }

    #[test]
    fn unmatched_mutation_keeps_the_offer_live() {
        let mut detector = AcceptanceDetector::new();
        offering(&mut detector, 1, &["expected_completion_text();"]);

        assert_eq!(detector.on_buffer_mutated("zzz"), None);
        assert!(matches!(detector.state(), DetectorState::Offering(_)));
        assert!(detector.on_buffer_mutated("expected_completion_text();").is_some());
    }

    #[test]
    fn stale_response_is_dropped_after_supersession() {
        let mut detector = AcceptanceDetector::new();
        detector.on_trigger(1);
        detector.on_trigger(2);

        // The first (stale) response arrives late and is discarded.
        let installed = detector.on_response(
            1,
            FimPrompt::frame("old", 3),
            candidates(&["old();"]),
            3,
        );
        assert!(!installed);
        assert!(matches!(
            detector.state(),
            DetectorState::AwaitingResponse { generation: 2 }
        ));

        // The current response still installs.
        assert!(detector.on_response(
            2,
            FimPrompt::frame("new", 3),
            candidates(&["new();"]),
            3,
        ));
        assert_eq!(detector.on_buffer_mutated("old();"), None);
        assert!(detector.on_buffer_mutated("new();").is_some());
    }

    #[test]
    fn empty_candidate_set_returns_to_idle() {
        let mut detector = AcceptanceDetector::new();
        detector.on_trigger(1);
        let installed =
            detector.on_response(1, FimPrompt::frame("x", 1), CandidateSet::empty(), 1);
        assert!(!installed);
        assert!(detector.is_idle());
    }

    #[test]
    fn dwell_expiry_only_clears_its_own_generation() {
        let mut detector = AcceptanceDetector::new();
        offering(&mut detector, 1, &["one();"]);

        // A timer from a previous life is a no-op.
        assert!(!detector.on_dwell_expired(0));
        assert!(matches!(detector.state(), DetectorState::Offering(_)));

        assert!(detector.on_dwell_expired(1));
        assert!(detector.is_idle());
        assert_eq!(detector.on_buffer_mutated("one();"), None);

        // The timer echo after expiry is also a no-op.
        assert!(!detector.on_dwell_expired(1));
    }

    #[test]
    fn new_trigger_supersedes_a_live_offer() {
        let mut detector = AcceptanceDetector::new();
        offering(&mut detector, 1, &["one();"]);

        detector.on_trigger(2);
        assert_eq!(detector.on_buffer_mutated("one();"), None);
        // The superseded offer's dwell timer cannot clear the new request.
        assert!(!detector.on_dwell_expired(1));
        assert!(matches!(
            detector.state(),
            DetectorState::AwaitingResponse { generation: 2 }
        ));
    }
}
