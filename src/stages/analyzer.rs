//! Risk analysis stage
//!
//! Sends the contract text (plus recent conversation context) to the
//! model and extracts the structured report from the reply. A reply with
//! no parseable JSON is not a fault: the stage stores an empty report and
//! lets the critic's low score drive refinement downstream.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Stage, StageError};
use crate::extract::extract_json;
use crate::llm::TextGenerator;
use crate::prompts::RISK_ANALYSIS_PROMPT;
use crate::state::{StatePatch, Status, WorkflowState};

/// How many trailing messages feed the analysis context
const CONTEXT_MESSAGES: usize = 3;

pub struct AnalyzerStage {
    llm: Arc<dyn TextGenerator>,
}

impl AnalyzerStage {
    pub fn new(llm: Arc<dyn TextGenerator>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for AnalyzerStage {
    fn name(&self) -> &'static str {
        "analysis"
    }

    async fn run(&self, state: &WorkflowState) -> Result<StatePatch, StageError> {
        let recent_context: Vec<String> = state
            .messages
            .iter()
            .rev()
            .take(CONTEXT_MESSAGES)
            .rev()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect();
        let full_input = format!(
            "{}\nAnalyze: {}",
            recent_context.join("\n"),
            state.input_contract
        );

        let prompt = format!("{}{}", RISK_ANALYSIS_PROMPT, full_input);
        tracing::debug!(prompt_len = prompt.len(), "Running risk analysis");

        let response = self.llm.generate(&prompt).await?;

        let report = match extract_json(response.trim()) {
            Some(value) => value,
            None => {
                tracing::warn!(thread_id = %state.thread_id, "No JSON object in analysis reply, storing empty report");
                serde_json::json!({})
            }
        };

        let human_flag = report
            .get("human_input")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        tracing::info!(human_input = human_flag, "Risk analysis complete");

        Ok(StatePatch {
            status: Some(Status::InProgress),
            message: Some(if human_flag {
                "Human input required".to_string()
            } else {
                String::new()
            }),
            risk_analysis_report: Some(report),
            human_input: Some(human_flag),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;

    struct ScriptedLlm(&'static str);

    #[async_trait]
    impl TextGenerator for ScriptedLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl TextGenerator for FailingLlm {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Provider("quota exceeded".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn state() -> WorkflowState {
        WorkflowState::new("u1", "Migrate billing to a new vendor in Q3", "t1")
    }

    #[tokio::test]
    async fn test_report_extracted_from_reply() {
        let stage = AnalyzerStage::new(Arc::new(ScriptedLlm(
            r#"{"human_input": false, "analysis": [{"risk": "vendor lock-in", "type": "Strategic", "impact": "High", "reason": "single supplier", "mitigation": "exit clause"}]}"#,
        )));

        let patch = stage.run(&state()).await.unwrap();

        assert_eq!(patch.status, Some(Status::InProgress));
        assert_eq!(patch.human_input, Some(false));
        assert_eq!(patch.message.as_deref(), Some(""));
        let report = patch.risk_analysis_report.unwrap();
        assert_eq!(report["analysis"][0]["risk"], "vendor lock-in");
    }

    #[tokio::test]
    async fn test_clarification_reply_sets_human_input() {
        let stage = AnalyzerStage::new(Arc::new(ScriptedLlm(
            r#"{"human_input": true, "clarification": ["What is the migration budget?"]}"#,
        )));

        let patch = stage.run(&state()).await.unwrap();

        assert_eq!(patch.human_input, Some(true));
        assert_eq!(patch.message.as_deref(), Some("Human input required"));
    }

    #[tokio::test]
    async fn test_unparseable_reply_yields_empty_report() {
        let stage = AnalyzerStage::new(Arc::new(ScriptedLlm("I could not produce JSON, sorry")));

        let patch = stage.run(&state()).await.unwrap();

        // Not a fault: empty report, flow continues
        assert_eq!(patch.status, Some(Status::InProgress));
        assert_eq!(patch.risk_analysis_report, Some(serde_json::json!({})));
        assert_eq!(patch.human_input, Some(false));
        assert!(patch.errors.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let stage = AnalyzerStage::new(Arc::new(FailingLlm));
        let err = stage.run(&state()).await.unwrap_err();
        assert!(matches!(err, StageError::Generation(_)));
    }
}
