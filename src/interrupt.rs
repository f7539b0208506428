//! Human-review suspension point
//!
//! Entering `human_review` halts the traversal: the controller marks the
//! state as awaiting input and hands a prompt back to the caller. Resume
//! semantics live on the engine; the controller holds no state of its
//! own beyond the prompt text.

use crate::state::{Status, WorkflowState};

/// Default prompt shown to the reviewer
pub const HUMAN_REVIEW_PROMPT: &str =
    "Human review needed. Provide corrections or improvements.";

/// Signal emitted when a traversal suspends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    pub prompt: String,
}

/// Produces the suspension signal for the human-review node
#[derive(Debug, Clone)]
pub struct InterruptController {
    prompt: String,
}

impl Default for InterruptController {
    fn default() -> Self {
        Self {
            prompt: HUMAN_REVIEW_PROMPT.to_string(),
        }
    }
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the reviewer-facing prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Mark the state suspended and emit the prompt.
    ///
    /// The caller persists the state and stops executing nodes until an
    /// external resume arrives for this thread.
    pub fn suspend(&self, state: &mut WorkflowState) -> Suspension {
        tracing::info!(thread_id = %state.thread_id, "Suspending for human review");
        state.set_status(Status::AwaitingHuman);
        Suspension {
            prompt: self.prompt.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suspend_sets_awaiting_status_and_prompt() {
        let controller = InterruptController::new();
        let mut state = WorkflowState::new("u1", "contract text", "t1");

        let suspension = controller.suspend(&mut state);

        assert_eq!(state.status, Status::AwaitingHuman);
        assert!(!suspension.prompt.is_empty());
        assert_eq!(suspension.prompt, HUMAN_REVIEW_PROMPT);
    }

    #[test]
    fn test_custom_prompt() {
        let controller = InterruptController::new().with_prompt("Check the figures.");
        let mut state = WorkflowState::new("u1", "contract text", "t1");

        let suspension = controller.suspend(&mut state);
        assert_eq!(suspension.prompt, "Check the figures.");
    }
}
