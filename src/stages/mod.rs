//! Workflow stages and the fault-absorbing executor
//!
//! Stages are pure with respect to the state: they receive a shared
//! reference and return a `StatePatch`. The executor is the single
//! boundary where stage faults are absorbed and normalized into
//! `errors` + `status = failed`; stages themselves return typed failures.

mod analyzer;
pub mod critic;
mod summarizer;
mod validation;

pub use analyzer::AnalyzerStage;
pub use critic::CriticStage;
pub use summarizer::SummarizerStage;
pub use validation::ValidationStage;

use async_trait::async_trait;

use crate::checkpoint::PersistenceError;
use crate::llm::GenerationError;
use crate::state::{StatePatch, WorkflowState};

/// Typed stage failure
///
/// Parse failures are deliberately absent: malformed model output is
/// treated as an empty report and the flow continues.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// One unit of processing in the workflow graph
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage id used in logs and error strings
    fn name(&self) -> &'static str;

    async fn run(&self, state: &WorkflowState) -> Result<StatePatch, StageError>;
}

/// Runs a stage and merges its output into the state.
///
/// The only place faults are absorbed: an `Err` from a stage becomes a
/// synthetic `{status: failed, errors: [description]}` patch, which the
/// engine treats identically to a stage-reported failure.
#[derive(Debug, Default)]
pub struct StageExecutor;

impl StageExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, stage: &dyn Stage, state: &mut WorkflowState) {
        tracing::info!(stage = stage.name(), thread_id = %state.thread_id, "Executing stage");

        let patch = match stage.run(state).await {
            Ok(patch) => patch,
            Err(e) => {
                tracing::error!(stage = stage.name(), error = %e, "Stage failed");
                StatePatch::failure(format!("{} error: {}", stage.name(), e))
            }
        };

        state.apply(patch);
        tracing::debug!(
            stage = stage.name(),
            status = %state.status,
            errors = state.errors.len(),
            "Stage complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Status;

    struct OkStage;

    #[async_trait]
    impl Stage for OkStage {
        fn name(&self) -> &'static str {
            "ok"
        }

        async fn run(&self, _state: &WorkflowState) -> Result<StatePatch, StageError> {
            Ok(StatePatch {
                status: Some(Status::InProgress),
                message: Some("fine".to_string()),
                ..Default::default()
            })
        }
    }

    struct FaultyStage;

    #[async_trait]
    impl Stage for FaultyStage {
        fn name(&self) -> &'static str {
            "faulty"
        }

        async fn run(&self, _state: &WorkflowState) -> Result<StatePatch, StageError> {
            Err(StageError::Generation(GenerationError::Provider(
                "model unavailable".to_string(),
            )))
        }
    }

    #[tokio::test]
    async fn test_success_patch_is_merged() {
        let executor = StageExecutor::new();
        let mut state = WorkflowState::new("u1", "contract text", "t1");

        executor.execute(&OkStage, &mut state).await;

        assert_eq!(state.status, Status::InProgress);
        assert_eq!(state.message.as_deref(), Some("fine"));
        assert!(state.errors.is_empty());
    }

    #[tokio::test]
    async fn test_fault_is_normalized_into_failed_state() {
        let executor = StageExecutor::new();
        let mut state = WorkflowState::new("u1", "contract text", "t1");

        executor.execute(&FaultyStage, &mut state).await;

        assert_eq!(state.status, Status::Failed);
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("faulty error"));
        assert!(state.errors[0].contains("model unavailable"));
    }
}
