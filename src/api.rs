//! Boundary request/response shapes
//!
//! Transport-agnostic: a CLI, an HTTP layer, or a test drives the engine
//! through these types. The response mirrors the workflow state's public
//! fields; suspended runs additionally carry the reviewer prompt and a
//! partial state view.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{EngineError, RunResult, WorkflowEngine};
use crate::state::WorkflowState;

/// Start a new analysis (or a new pass over an existing thread id)
#[derive(Debug, Clone, Deserialize)]
pub struct StartRequest {
    /// Absent thread id means a fresh thread
    pub thread_id: Option<String>,
    pub user_id: String,
    pub message: String,
}

/// Resume a suspended analysis with human feedback
#[derive(Debug, Clone, Deserialize)]
pub struct ResumeRequest {
    pub thread_id: String,
    pub feedback: String,
}

/// Partial state view returned while a run is suspended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialState {
    pub summary: Option<String>,
    pub risk_analysis_report: Option<serde_json::Value>,
    pub message: Option<String>,
    pub quality_score: u8,
}

/// Outcome of a start or resume call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    pub thread_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_analysis_report: Option<serde_json::Value>,
    pub quality_score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_for_human: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_state: Option<PartialState>,
}

impl AnalysisResponse {
    pub fn from_run(result: RunResult) -> Self {
        match result {
            RunResult::Completed(state) | RunResult::Failed(state) => Self::terminal(state),
            RunResult::AwaitingHuman { state, prompt } => Self::suspended(state, prompt),
        }
    }

    fn terminal(state: WorkflowState) -> Self {
        Self {
            status: state.status.to_string(),
            thread_id: state.thread_id,
            errors: state.errors,
            message: state.message,
            summary: state.summary,
            risk_analysis_report: state.risk_analysis_report,
            quality_score: state.quality_score,
            prompt_for_human: None,
            partial_state: None,
        }
    }

    fn suspended(state: WorkflowState, prompt: String) -> Self {
        let partial = PartialState {
            summary: state.summary.clone(),
            risk_analysis_report: state.risk_analysis_report.clone(),
            message: state.message.clone(),
            quality_score: state.quality_score,
        };
        Self {
            status: state.status.to_string(),
            thread_id: state.thread_id,
            errors: state.errors,
            message: state.message,
            summary: state.summary,
            risk_analysis_report: state.risk_analysis_report,
            quality_score: state.quality_score,
            prompt_for_human: Some(prompt),
            partial_state: Some(partial),
        }
    }
}

/// Run a fresh analysis. Generates a thread id when the request carries
/// none.
pub async fn start_analysis(engine: &WorkflowEngine, request: StartRequest) -> AnalysisResponse {
    let thread_id = request
        .thread_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let state = WorkflowState::new(request.user_id, request.message.trim(), thread_id);
    AnalysisResponse::from_run(engine.start(state).await)
}

/// Resume a suspended thread. `NotFound` when no checkpoint exists.
pub async fn resume_analysis(
    engine: &WorkflowEngine,
    request: ResumeRequest,
) -> Result<AnalysisResponse, EngineError> {
    let result = engine.resume(&request.thread_id, &request.feedback).await?;
    Ok(AnalysisResponse::from_run(result))
}
