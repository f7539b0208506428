//! Summarization stage
//!
//! Turns the final risk analysis report into an executive-readable
//! markdown summary. The summary also becomes the outgoing status
//! message on success.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Stage, StageError};
use crate::llm::TextGenerator;
use crate::prompts::SUMMARIZER_PROMPT;
use crate::state::{StatePatch, Status, WorkflowState};

/// How many trailing messages feed the summarization context
const CONTEXT_MESSAGES: usize = 10;

pub struct SummarizerStage {
    llm: Arc<dyn TextGenerator>,
}

impl SummarizerStage {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for SummarizerStage {
    fn name(&self) -> &'static str {
        "summarization"
    }

    async fn run(&self, state: &WorkflowState) -> Result<StatePatch, StageError> {
        let recent: Vec<String> = state
            .messages
            .iter()
            .rev()
            .take(CONTEXT_MESSAGES)
            .rev()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect();

        let report_json = state
            .risk_analysis_report
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "{}".to_string());

        let prompt = format!(
            "{}{}\nConversation: {}",
            SUMMARIZER_PROMPT,
            report_json,
            recent.join("\n")
        );
        tracing::debug!(prompt_len = prompt.len(), "Running summarization");

        let summary = self.llm.generate(&prompt).await?;
        let summary = summary.trim().to_string();
        tracing::info!(summary_len = summary.len(), "Summary generated");

        Ok(StatePatch {
            status: Some(Status::Success),
            message: Some(summary.clone()),
            summary: Some(summary),
            ..Default::default()
        })
    }
}
