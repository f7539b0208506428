//! Quality gate and refinement decision
//!
//! The only cycle in the graph runs through here. Rule order is strict
//! first-match: human review beats refinement beats summarization, and
//! the refinement guard is bounded by `MAX_REFINEMENTS`, so the loop
//! always exits after at most that many extra analyzer passes.

use crate::state::WorkflowState;

/// Quality score below which a refinement pass is requested
pub const QUALITY_THRESHOLD: u8 = 80;

/// Hard cap on extra analyzer passes per traversal
pub const MAX_REFINEMENTS: u32 = 2;

/// Outcome of the arbiter's decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbiterDecision {
    /// Suspend and wait for human corrections
    HumanReview,
    /// Run the analyzer again
    Refine,
    /// Quality is acceptable, summarize
    Summarize,
}

/// Decide the next node from the critic's output
pub fn decide(state: &WorkflowState) -> ArbiterDecision {
    if state.human_input {
        tracing::info!(thread_id = %state.thread_id, "Arbiter: human review requested");
        return ArbiterDecision::HumanReview;
    }

    if state.quality_score < QUALITY_THRESHOLD && state.refinement_count < MAX_REFINEMENTS {
        tracing::info!(
            thread_id = %state.thread_id,
            quality_score = state.quality_score,
            refinement_count = state.refinement_count,
            "Arbiter: refining"
        );
        return ArbiterDecision::Refine;
    }

    tracing::info!(
        thread_id = %state.thread_id,
        quality_score = state.quality_score,
        "Arbiter: quality accepted"
    );
    ArbiterDecision::Summarize
}
