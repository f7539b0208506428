//! Input validation stage
//!
//! Two gates: a local minimum-length check that fails fast without
//! touching the model, then an LLM relevance check against the last
//! few conversation messages.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Stage, StageError};
use crate::llm::TextGenerator;
use crate::prompts::VALIDATION_PROMPT;
use crate::state::{StatePatch, Status, WorkflowState};

/// Inputs shorter than this (trimmed) fail without an LLM call
pub const MIN_INPUT_LEN: usize = 3;

/// How many trailing messages feed the validation context
const CONTEXT_MESSAGES: usize = 5;

pub struct ValidationStage {
    llm: Arc<dyn TextGenerator>,
}

impl ValidationStage {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for ValidationStage {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn run(&self, state: &WorkflowState) -> Result<StatePatch, StageError> {
        if state.input_contract.trim().len() < MIN_INPUT_LEN {
            tracing::warn!(thread_id = %state.thread_id, "Input too short, failing validation");
            return Ok(StatePatch {
                status: Some(Status::Failed),
                message: Some("Input validation failed.".to_string()),
                errors: vec!["Input too short.".to_string()],
                ..Default::default()
            });
        }

        let context: Vec<String> = state
            .messages
            .iter()
            .rev()
            .take(CONTEXT_MESSAGES)
            .rev()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect();
        let full_input = format!("{}\nCurrent: {}", context.join("\n"), state.input_contract);

        let prompt = format!("{}{}", VALIDATION_PROMPT, full_input);
        let response = self.llm.generate(&prompt).await?;
        let response = response.trim();

        if response.contains("Invalid Input") {
            tracing::warn!(thread_id = %state.thread_id, "Model marked the input as invalid");
            return Ok(StatePatch {
                status: Some(Status::Failed),
                message: Some(response.to_string()),
                errors: vec!["Invalid contract data.".to_string()],
                ..Default::default()
            });
        }

        Ok(StatePatch {
            status: Some(Status::InProgress),
            message: Some("OK".to_string()),
            ..Default::default()
        })
    }
}
