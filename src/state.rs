//! Workflow state threaded through every stage
//!
//! One `WorkflowState` exists per conversation thread. Stages never mutate
//! it directly; they return a `StatePatch` which the executor merges with
//! fixed precedence rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal and intermediate workflow statuses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Failed,
    Success,
    AwaitingHuman,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Failed => "failed",
            Status::Success => "success",
            Status::AwaitingHuman => "awaiting_human",
        };
        write!(f, "{}", s)
    }
}

/// Who produced a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the append-only conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Some(Utc::now()),
            metadata: None,
        }
    }
}

/// Mutable record for one analysis thread
///
/// Serialized as-is into the checkpoint store after every stage
/// transition, so every field must round-trip through JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Stable thread identity, assigned once and never changed after
    pub thread_id: String,
    pub user_id: String,
    /// Current analysis input text (feedback gets appended on resume)
    pub input_contract: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub status: Status,
    /// Latest human-facing status note, overwritten by each stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// `{human_input: true, clarification: [..]}` or
    /// `{human_input: false, analysis: [..]}`; None before the analyzer runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_analysis_report: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub quality_score: u8,
    #[serde(default)]
    pub refinement_count: u32,
    #[serde(default)]
    pub human_input: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl WorkflowState {
    pub fn new(
        user_id: impl Into<String>,
        input_contract: impl Into<String>,
        thread_id: impl Into<String>,
    ) -> Self {
        let state = Self {
            thread_id: thread_id.into(),
            user_id: user_id.into(),
            input_contract: input_contract.into(),
            feedback: None,
            messages: Vec::new(),
            errors: Vec::new(),
            status: Status::Pending,
            message: None,
            risk_analysis_report: None,
            summary: None,
            quality_score: 0,
            refinement_count: 0,
            human_input: false,
            approved: None,
        };
        tracing::debug!(
            user_id = %state.user_id,
            thread_id = %state.thread_id,
            "Initialized workflow state"
        );
        state
    }

    /// Append a message to the conversation log
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        let msg = ChatMessage::new(role, content);
        tracing::debug!(role = %msg.role.as_str(), total = self.messages.len() + 1, "Adding message to state");
        self.messages.push(msg);
    }

    /// Record an error; non-empty errors imply a failed run
    pub fn add_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        tracing::warn!(%error, thread_id = %self.thread_id, "Adding error to state");
        self.errors.push(error);
    }

    pub fn set_status(&mut self, status: Status) {
        tracing::debug!(from = %self.status, to = %status, "Status transition");
        self.status = status;
    }

    /// True once the run must not execute any further stage
    pub fn is_failed(&self) -> bool {
        self.status == Status::Failed || !self.errors.is_empty()
    }

    /// Merge a stage's partial update into this state.
    ///
    /// Precedence rules:
    /// - `errors` is appended to, never replaced
    /// - `message` is replaced whenever the patch carries one (the later
    ///   stage always wins)
    /// - every other field overwrites only when present in the patch
    /// - `thread_id` is never part of a patch
    pub fn apply(&mut self, patch: StatePatch) {
        for error in patch.errors {
            self.errors.push(error);
        }
        if let Some(status) = patch.status {
            self.set_status(status);
        }
        if let Some(message) = patch.message {
            self.message = Some(message);
        }
        if let Some(input_contract) = patch.input_contract {
            self.input_contract = input_contract;
        }
        if let Some(report) = patch.risk_analysis_report {
            self.risk_analysis_report = Some(report);
        }
        if let Some(summary) = patch.summary {
            self.summary = Some(summary);
        }
        if let Some(score) = patch.quality_score {
            self.quality_score = score;
        }
        if let Some(count) = patch.refinement_count {
            self.refinement_count = count;
        }
        if let Some(flag) = patch.human_input {
            self.human_input = flag;
        }
    }
}

/// Typed partial update returned by a stage
///
/// Replaces the loosely-typed dict merging of earlier designs; every
/// field is explicit and merged by [`WorkflowState::apply`].
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub status: Option<Status>,
    pub message: Option<String>,
    pub input_contract: Option<String>,
    pub risk_analysis_report: Option<serde_json::Value>,
    pub summary: Option<String>,
    pub quality_score: Option<u8>,
    pub refinement_count: Option<u32>,
    pub human_input: Option<bool>,
    pub errors: Vec<String>,
}

impl StatePatch {
    /// Patch marking the run as failed with a single error
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Failed),
            errors: vec![error.into()],
            ..Default::default()
        }
    }
}
