//! Pure routing decisions between stages
//!
//! Routers only look at the error/failed signal; `human_input` and
//! `quality_score` belong exclusively to the arbiter.

use crate::state::WorkflowState;

/// Nodes of the workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Validation,
    Analyzer,
    Critic,
    Arbiter,
    HumanReview,
    Summarizer,
    End,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Node::Validation => "validation",
            Node::Analyzer => "analyzer",
            Node::Critic => "critic",
            Node::Arbiter => "arbiter",
            Node::HumanReview => "human_review",
            Node::Summarizer => "summarizer",
            Node::End => "end",
        };
        write!(f, "{}", s)
    }
}

/// After validation: failed state ends the run, otherwise analyze
pub fn route_after_validation(state: &WorkflowState) -> Node {
    if state.is_failed() {
        Node::End
    } else {
        Node::Analyzer
    }
}

/// After analysis: failed state ends the run, otherwise critique
pub fn route_after_analyzer(state: &WorkflowState) -> Node {
    if state.is_failed() {
        Node::End
    } else {
        Node::Critic
    }
}
