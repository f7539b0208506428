//! Workflow execution engine
//!
//! Drives the stage sequence for one thread at a time:
//! validation -> analyzer -> critic -> arbiter -> {analyzer | human_review
//! | summarizer} -> end. State is persisted after every transition; a
//! persistence failure converts the run to failed on the spot. One engine
//! instance is constructed at process start and shared; there is no
//! hidden global graph.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::arbiter::{self, ArbiterDecision};
use crate::checkpoint::{CheckpointStore, PersistenceError};
use crate::db::Database;
use crate::interrupt::InterruptController;
use crate::llm::TextGenerator;
use crate::router::{self, Node};
use crate::stages::{AnalyzerStage, CriticStage, StageExecutor, SummarizerStage, ValidationStage};
use crate::state::{Role, StatePatch, Status, WorkflowState};

/// Engine-boundary failure
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no checkpoint found for thread {0}")]
    NotFound(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Outcome of one traversal
#[derive(Debug)]
pub enum RunResult {
    Completed(WorkflowState),
    Failed(WorkflowState),
    AwaitingHuman { state: WorkflowState, prompt: String },
}

impl RunResult {
    pub fn state(&self) -> &WorkflowState {
        match self {
            RunResult::Completed(s) | RunResult::Failed(s) => s,
            RunResult::AwaitingHuman { state, .. } => state,
        }
    }
}

/// Checkpointed, resumable multi-stage workflow engine
pub struct WorkflowEngine {
    validation: ValidationStage,
    analyzer: AnalyzerStage,
    critic: CriticStage,
    summarizer: SummarizerStage,
    executor: StageExecutor,
    interrupt: InterruptController,
    checkpoints: Arc<dyn CheckpointStore>,
    conversations: Option<Database>,
    /// Per-thread traversal locks: at most one start/resume in flight per
    /// thread id
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl WorkflowEngine {
    pub fn new(generator: Arc<dyn TextGenerator>, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        Self {
            validation: ValidationStage::new(generator.clone()),
            analyzer: AnalyzerStage::new(generator.clone()),
            critic: CriticStage::new(),
            summarizer: SummarizerStage::new(generator),
            executor: StageExecutor::new(),
            interrupt: InterruptController::new(),
            checkpoints,
            conversations: None,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Record the conversation log in this database at engine entry/exit
    pub fn with_conversations(mut self, db: Database) -> Self {
        self.conversations = Some(db);
        self
    }

    pub fn with_interrupt(mut self, interrupt: InterruptController) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Start a fresh traversal for the thread carried by `state`.
    ///
    /// Runs until a terminal status or suspension; persists after each
    /// stage. Concurrent calls for the same thread are serialized.
    pub async fn start(&self, mut state: WorkflowState) -> RunResult {
        let lock = self.thread_lock(&state.thread_id);
        let _guard = lock.lock().await;

        tracing::info!(thread_id = %state.thread_id, user_id = %state.user_id, "Starting workflow");

        self.record_entry(&state);
        state.add_message(Role::User, state.input_contract.clone());

        self.run_graph(state).await
    }

    /// Resume a suspended thread with human feedback.
    ///
    /// Loads the latest checkpoint (`NotFound` if absent), folds the
    /// feedback into the input, and re-enters the graph at validation so
    /// the combined input is validated again.
    pub async fn resume(&self, thread_id: &str, feedback: &str) -> Result<RunResult, EngineError> {
        let lock = self.thread_lock(thread_id);
        let _guard = lock.lock().await;

        tracing::info!(thread_id, "Resuming workflow");

        let mut state = self
            .checkpoints
            .get(thread_id)?
            .ok_or_else(|| EngineError::NotFound(thread_id.to_string()))?;

        state.add_message(Role::User, feedback);
        state.input_contract = format!("{}\nFeedback: {}", state.input_contract, feedback);
        state.feedback = Some(feedback.to_string());
        state.human_input = false;
        state.message = None;
        state.set_status(Status::InProgress);

        if let Some(db) = &self.conversations {
            if let Err(e) = db.add_thread_message(thread_id, Role::User, feedback) {
                tracing::warn!(thread_id, error = %e, "Failed to record feedback message");
            }
        }

        Ok(self.run_graph(state).await)
    }

    async fn run_graph(&self, mut state: WorkflowState) -> RunResult {
        let mut node = Node::Validation;

        loop {
            tracing::debug!(node = %node, thread_id = %state.thread_id, "Entering node");
            match node {
                Node::Validation => {
                    self.executor.execute(&self.validation, &mut state).await;
                    if let Err(e) = self.persist(&state) {
                        return self.persistence_failure(state, e);
                    }
                    node = router::route_after_validation(&state);
                }

                Node::Analyzer => {
                    self.executor.execute(&self.analyzer, &mut state).await;
                    if let Err(e) = self.persist(&state) {
                        return self.persistence_failure(state, e);
                    }
                    node = router::route_after_analyzer(&state);
                }

                Node::Critic => {
                    self.executor.execute(&self.critic, &mut state).await;
                    if let Err(e) = self.persist(&state) {
                        return self.persistence_failure(state, e);
                    }
                    node = if state.is_failed() { Node::End } else { Node::Arbiter };
                }

                Node::Arbiter => match arbiter::decide(&state) {
                    ArbiterDecision::HumanReview => {
                        state.apply(StatePatch {
                            message: Some("Human review requested".to_string()),
                            ..Default::default()
                        });
                        node = Node::HumanReview;
                    }
                    ArbiterDecision::Refine => {
                        state.apply(StatePatch {
                            message: Some("Refining based on quality score".to_string()),
                            refinement_count: Some(state.refinement_count + 1),
                            ..Default::default()
                        });
                        if let Err(e) = self.persist(&state) {
                            return self.persistence_failure(state, e);
                        }
                        node = Node::Analyzer;
                    }
                    ArbiterDecision::Summarize => {
                        state.apply(StatePatch {
                            message: Some("Quality is good".to_string()),
                            ..Default::default()
                        });
                        if let Err(e) = self.persist(&state) {
                            return self.persistence_failure(state, e);
                        }
                        node = Node::Summarizer;
                    }
                },

                Node::HumanReview => {
                    let suspension = self.interrupt.suspend(&mut state);
                    if let Err(e) = self.persist(&state) {
                        return self.persistence_failure(state, e);
                    }
                    self.record_exit(&state);
                    tracing::info!(thread_id = %state.thread_id, "Workflow suspended for human review");
                    return RunResult::AwaitingHuman {
                        state,
                        prompt: suspension.prompt,
                    };
                }

                Node::Summarizer => {
                    self.executor.execute(&self.summarizer, &mut state).await;
                    if let Err(e) = self.persist(&state) {
                        return self.persistence_failure(state, e);
                    }
                    node = Node::End;
                }

                Node::End => {
                    self.record_exit(&state);
                    return if state.is_failed() {
                        // Keep the invariant: non-empty errors imply failed
                        state.set_status(Status::Failed);
                        tracing::warn!(thread_id = %state.thread_id, errors = ?state.errors, "Workflow failed");
                        RunResult::Failed(state)
                    } else {
                        tracing::info!(thread_id = %state.thread_id, "Workflow completed");
                        RunResult::Completed(state)
                    };
                }
            }
        }
    }

    fn persist(&self, state: &WorkflowState) -> Result<(), PersistenceError> {
        self.checkpoints.save(&state.thread_id, state)
    }

    /// An unsaved transition is never crossed: the run fails here
    fn persistence_failure(&self, mut state: WorkflowState, e: PersistenceError) -> RunResult {
        tracing::error!(thread_id = %state.thread_id, error = %e, "Checkpoint save failed, aborting run");
        state.add_error(format!("Persistence error: {}", e));
        state.set_status(Status::Failed);
        self.record_exit(&state);
        RunResult::Failed(state)
    }

    fn thread_lock(&self, thread_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Conversation log, engine entry only. Store failures are logged,
    /// never fatal to the traversal.
    fn record_entry(&self, state: &WorkflowState) {
        let Some(db) = &self.conversations else {
            return;
        };
        let result = db
            .ensure_conversation(&state.user_id, &state.thread_id)
            .and_then(|conv_id| db.add_message(&conv_id, Role::User, &state.input_contract));
        if let Err(e) = result {
            tracing::warn!(thread_id = %state.thread_id, error = %e, "Failed to record entry message");
        }
    }

    /// Conversation log, engine exit only
    fn record_exit(&self, state: &WorkflowState) {
        let Some(db) = &self.conversations else {
            return;
        };
        let Some(message) = state.message.as_deref().filter(|m| !m.is_empty()) else {
            return;
        };
        if let Err(e) = db.add_thread_message(&state.thread_id, Role::Assistant, message) {
            tracing::warn!(thread_id = %state.thread_id, error = %e, "Failed to record exit message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::MemoryCheckpointStore;
    use crate::llm::GenerationError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Replays a fixed sequence of replies, one per generate call
    struct ScriptedGenerator {
        replies: StdMutex<VecDeque<Result<String, String>>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: StdMutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(e)) => Err(GenerationError::Provider(e)),
                None => panic!("scripted generator exhausted"),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    // Three top-level keys push the critic score to at least 80, so the
    // arbiter routes straight to the summarizer.
    const GOOD_REPORT: &str = r#"{"human_input": false, "overall_posture": "Moderate", "analysis": [{"risk": "Vendor dependency creates single point of failure for the entire integration program", "type": "Strategic", "impact": "High", "reason": "All delivery milestones depend on one external API provider with no contractual SLA", "mitigation": "Negotiate an SLA with penalties and line up a secondary provider before phase two"}, {"risk": "Timeline assumes zero staff turnover across nine months", "type": "Resource / Staffing", "impact": "Medium", "reason": "The plan has no buffer for onboarding replacements", "mitigation": "Add a two-week buffer per quarter and document critical knowledge"}]}"#;

    fn engine(replies: Vec<Result<&str, &str>>) -> (WorkflowEngine, Arc<MemoryCheckpointStore>) {
        let store = Arc::new(MemoryCheckpointStore::new());
        let engine = WorkflowEngine::new(ScriptedGenerator::new(replies), store.clone());
        (engine, store)
    }

    #[tokio::test]
    async fn test_happy_path_completes_with_summary() {
        let (engine, store) = engine(vec![
            Ok("OK"),          // validation
            Ok(GOOD_REPORT),   // analyzer
            Ok("## Summary\n\nTwo risks identified."), // summarizer
        ]);

        let state = WorkflowState::new("u1", "Integrate the vendor API in 9 months", "t1");
        let result = engine.start(state).await;

        let RunResult::Completed(state) = result else {
            panic!("expected completion");
        };
        assert_eq!(state.status, Status::Success);
        assert_eq!(state.summary.as_deref(), Some("## Summary\n\nTwo risks identified."));
        assert_eq!(state.refinement_count, 0);
        assert!(state.quality_score >= 80);

        // Final state is checkpointed
        let saved = store.get("t1").unwrap().unwrap();
        assert_eq!(saved.status, Status::Success);
    }

    #[tokio::test]
    async fn test_short_input_fails_without_analyzer() {
        // No replies scripted: any LLM call would panic the generator
        let (engine, store) = engine(vec![]);

        let state = WorkflowState::new("u1", "hi", "t1");
        let result = engine.start(state).await;

        let RunResult::Failed(state) = result else {
            panic!("expected failure");
        };
        assert_eq!(state.status, Status::Failed);
        assert_eq!(state.errors, vec!["Input too short."]);
        assert!(store.get("t1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_refinement_loop_is_bounded() {
        // Empty reports score 30 forever; the loop must exit after
        // MAX_REFINEMENTS extra passes and still summarize.
        let (engine, _) = engine(vec![
            Ok("OK"),   // validation
            Ok("{}"),   // analyzer pass 1
            Ok("{}"),   // analyzer pass 2 (refinement 1)
            Ok("{}"),   // analyzer pass 3 (refinement 2)
            Ok("A thin summary."), // summarizer
        ]);

        let state = WorkflowState::new("u1", "Replatform the data warehouse", "t1");
        let result = engine.start(state).await;

        let RunResult::Completed(state) = result else {
            panic!("expected completion");
        };
        assert_eq!(state.refinement_count, arbiter::MAX_REFINEMENTS);
        assert_eq!(state.status, Status::Success);
    }

    #[tokio::test]
    async fn test_human_input_suspends_with_prompt() {
        let (engine, store) = engine(vec![
            Ok("OK"),
            Ok(r#"{"human_input": true, "clarification": ["What is the budget?"]}"#),
        ]);

        let state = WorkflowState::new("u1", "Build the thing, details TBD", "t1");
        let result = engine.start(state).await;

        let RunResult::AwaitingHuman { state, prompt } = result else {
            panic!("expected suspension");
        };
        assert!(!prompt.is_empty());
        assert_eq!(state.status, Status::AwaitingHuman);
        assert_eq!(state.message.as_deref(), Some("Human review requested"));

        // The suspended state is persisted, ready for resume
        let saved = store.get("t1").unwrap().unwrap();
        assert_eq!(saved.status, Status::AwaitingHuman);
    }

    #[tokio::test]
    async fn test_resume_without_checkpoint_is_not_found() {
        let (engine, store) = engine(vec![]);

        let err = engine.resume("ghost", "some feedback").await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
        // No workflow was created as a side effect
        assert!(store.get("ghost").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resume_restarts_at_validation_and_completes() {
        let (engine, store) = engine(vec![
            Ok("OK"),
            Ok(r#"{"human_input": true, "clarification": ["Which region?"]}"#),
            // resumed traversal
            Ok("OK"),
            Ok(GOOD_REPORT),
            Ok("Final summary."),
        ]);

        let initial = WorkflowState::new("u1", "Deploy the platform", "t1");
        let first = engine.start(initial).await;
        assert!(matches!(first, RunResult::AwaitingHuman { .. }));

        let result = engine.resume("t1", "EU region only").await.unwrap();
        let RunResult::Completed(state) = result else {
            panic!("expected completion");
        };
        assert_eq!(state.status, Status::Success);
        assert!(state.input_contract.contains("Feedback: EU region only"));
        assert!(!state.human_input);
        assert_eq!(state.feedback.as_deref(), Some("EU region only"));

        let saved = store.get("t1").unwrap().unwrap();
        assert_eq!(saved.status, Status::Success);
    }

    #[tokio::test]
    async fn test_generation_failure_fails_the_run() {
        let (engine, _) = engine(vec![Ok("OK"), Err("model offline")]);

        let state = WorkflowState::new("u1", "Ship the migration by June", "t1");
        let result = engine.start(state).await;

        let RunResult::Failed(state) = result else {
            panic!("expected failure");
        };
        assert_eq!(state.errors.len(), 1);
        assert!(state.errors[0].contains("model offline"));
    }

    #[tokio::test]
    async fn test_persistence_failure_fails_the_run() {
        struct BrokenStore;

        impl CheckpointStore for BrokenStore {
            fn get(&self, _: &str) -> Result<Option<WorkflowState>, PersistenceError> {
                Ok(None)
            }
            fn save(&self, _: &str, _: &WorkflowState) -> Result<(), PersistenceError> {
                Err(PersistenceError::Database("disk full".to_string()))
            }
            fn delete(&self, _: &str) -> Result<(), PersistenceError> {
                Ok(())
            }
        }

        let engine = WorkflowEngine::new(
            ScriptedGenerator::new(vec![Ok("OK")]),
            Arc::new(BrokenStore),
        );

        let state = WorkflowState::new("u1", "A perfectly valid contract description", "t1");
        let result = engine.start(state).await;

        let RunResult::Failed(state) = result else {
            panic!("expected failure");
        };
        assert!(state.errors.iter().any(|e| e.contains("disk full")));
    }
}
