//! End-to-end traversals through the workflow engine
//!
//! Drives the real engine with a scripted text generator and real
//! checkpoint stores (in-memory and SQLite), checking stage ordering,
//! refinement bounds, suspension, and resume behavior.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use riskflow::arbiter::MAX_REFINEMENTS;
use riskflow::checkpoint::{CheckpointStore, MemoryCheckpointStore};
use riskflow::db::{Database, SqliteCheckpointStore};
use riskflow::engine::{EngineError, RunResult, WorkflowEngine};
use riskflow::llm::{GenerationError, TextGenerator};
use riskflow::state::{Status, WorkflowState};

/// Replays scripted replies and records every prompt it was sent
struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn analyzer_calls(&self) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains("Risk Analyst"))
            .count()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| GenerationError::Provider("script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// 1 key with a short value scores 60: 50 + 10 + 5 * (len / 1000)
const THIN_REPORT: &str = r#"{"analysis": []}"#;

// 4 keys score 90 regardless of value detail
const RICH_REPORT: &str = r#"{"human_input": false, "posture": "High", "analysis": [{"risk": "Budget overrun", "type": "Financial", "impact": "High", "reason": "No contingency reserve", "mitigation": "Add a 15% reserve"}], "notes": "complete"}"#;

const CLARIFICATION_REPORT: &str =
    r#"{"human_input": true, "clarification": ["What is the delivery deadline?"]}"#;

const CONTRACT: &str =
    "Fixed-price contract to deliver a logistics platform in 12 months with a team of six";

#[tokio::test]
async fn too_short_input_fails_before_the_analyzer() {
    let llm = ScriptedGenerator::new(&[]);
    let store = Arc::new(MemoryCheckpointStore::new());
    let engine = WorkflowEngine::new(llm.clone(), store.clone());

    let result = engine.start(WorkflowState::new("u1", "hi", "t-short")).await;

    let RunResult::Failed(state) = result else {
        panic!("expected failed run");
    };
    assert_eq!(state.status, Status::Failed);
    assert_eq!(state.errors, vec!["Input too short."]);
    assert_eq!(llm.analyzer_calls(), 0);

    // The failed state is still checkpointed
    let saved = store.get("t-short").unwrap().unwrap();
    assert_eq!(saved.status, Status::Failed);
}

#[tokio::test]
async fn high_first_score_skips_refinement() {
    let llm = ScriptedGenerator::new(&["OK", RICH_REPORT, "## Summary\n\nOne financial risk."]);
    let engine = WorkflowEngine::new(llm.clone(), Arc::new(MemoryCheckpointStore::new()));

    let result = engine.start(WorkflowState::new("u1", CONTRACT, "t-good")).await;

    let RunResult::Completed(state) = result else {
        panic!("expected completion");
    };
    assert_eq!(state.refinement_count, 0);
    assert!(state.quality_score >= 80);
    assert_eq!(state.status, Status::Success);
    assert_eq!(state.summary.as_deref(), Some("## Summary\n\nOne financial risk."));
    assert_eq!(llm.analyzer_calls(), 1);
}

#[tokio::test]
async fn low_scores_refine_exactly_twice_then_summarize() {
    // Score sequence 60, 60, 90: two refinements, then the summarizer
    let llm = ScriptedGenerator::new(&[
        "OK",
        THIN_REPORT,
        THIN_REPORT,
        RICH_REPORT,
        "Summary after refinement.",
    ]);
    let engine = WorkflowEngine::new(llm.clone(), Arc::new(MemoryCheckpointStore::new()));

    let result = engine.start(WorkflowState::new("u1", CONTRACT, "t-refine")).await;

    let RunResult::Completed(state) = result else {
        panic!("expected completion");
    };
    assert_eq!(state.refinement_count, 2);
    assert_eq!(state.status, Status::Success);
    assert_eq!(llm.analyzer_calls(), 3);
}

#[tokio::test]
async fn analyzer_runs_are_bounded_even_when_quality_never_improves() {
    // Every report is thin; the cap must force a summary anyway
    let llm = ScriptedGenerator::new(&[
        "OK",
        THIN_REPORT,
        THIN_REPORT,
        THIN_REPORT,
        "Best-effort summary.",
    ]);
    let engine = WorkflowEngine::new(llm.clone(), Arc::new(MemoryCheckpointStore::new()));

    let result = engine.start(WorkflowState::new("u1", CONTRACT, "t-cap")).await;

    assert!(matches!(result, RunResult::Completed(_)));
    assert_eq!(llm.analyzer_calls() as u32, MAX_REFINEMENTS + 1);
}

#[tokio::test]
async fn clarification_request_suspends_with_persisted_state() {
    let llm = ScriptedGenerator::new(&["OK", CLARIFICATION_REPORT]);
    let store = Arc::new(MemoryCheckpointStore::new());
    let engine = WorkflowEngine::new(llm, store.clone());

    let result = engine.start(WorkflowState::new("u1", CONTRACT, "t-human")).await;

    let RunResult::AwaitingHuman { state, prompt } = result else {
        panic!("expected suspension");
    };
    assert!(!prompt.is_empty());
    assert_eq!(state.status, Status::AwaitingHuman);
    assert_eq!(state.message.as_deref(), Some("Human review requested"));

    let saved = store.get("t-human").unwrap().unwrap();
    assert_eq!(saved.status, Status::AwaitingHuman);
    assert!(saved.human_input);
}

#[tokio::test]
async fn resume_revalidates_combined_input_and_completes() {
    let llm = ScriptedGenerator::new(&[
        "OK",
        CLARIFICATION_REPORT,
        // resumed traversal: validation runs again on the combined input
        "OK",
        RICH_REPORT,
        "Summary with the deadline included.",
    ]);
    let store = Arc::new(MemoryCheckpointStore::new());
    let engine = WorkflowEngine::new(llm.clone(), store.clone());

    let first = engine.start(WorkflowState::new("u1", CONTRACT, "t-resume")).await;
    assert!(matches!(first, RunResult::AwaitingHuman { .. }));

    let result = engine
        .resume("t-resume", "Deadline is March 31st")
        .await
        .unwrap();

    let RunResult::Completed(state) = result else {
        panic!("expected completion after resume");
    };
    assert_eq!(state.status, Status::Success);
    assert!(state.input_contract.contains("Feedback: Deadline is March 31st"));
    assert!(!state.human_input);
    assert_eq!(llm.analyzer_calls(), 2);
}

#[tokio::test]
async fn resume_unknown_thread_is_not_found_and_creates_nothing() {
    let store = Arc::new(MemoryCheckpointStore::new());
    let engine = WorkflowEngine::new(ScriptedGenerator::new(&[]), store.clone());

    let err = engine.resume("missing", "feedback").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert!(store.get("missing").unwrap().is_none());
}

#[tokio::test]
async fn generation_failure_surfaces_as_failed_run() {
    // Validation passes, then the script runs dry: the analyzer's
    // provider error must fail the run instead of hanging or panicking
    let llm = ScriptedGenerator::new(&["OK"]);
    let engine = WorkflowEngine::new(llm, Arc::new(MemoryCheckpointStore::new()));

    let result = engine.start(WorkflowState::new("u1", CONTRACT, "t-genfail")).await;

    let RunResult::Failed(state) = result else {
        panic!("expected failed run");
    };
    assert_eq!(state.status, Status::Failed);
    assert!(state.errors.iter().any(|e| e.contains("script exhausted")));
}

#[tokio::test]
async fn sqlite_backed_run_records_conversation_and_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(dir.path().join("flow.db")).unwrap();
    let store = Arc::new(SqliteCheckpointStore::new(db.clone()));

    let llm = ScriptedGenerator::new(&["OK", RICH_REPORT, "Durable summary."]);
    let engine = WorkflowEngine::new(llm, store.clone()).with_conversations(db.clone());

    let user_id = db.get_or_create_user("pm@example.com").unwrap();
    let result = engine
        .start(WorkflowState::new(&user_id, CONTRACT, "t-sqlite"))
        .await;
    assert!(matches!(result, RunResult::Completed(_)));

    // Checkpoint round-trips through SQLite
    let saved = store.get("t-sqlite").unwrap().unwrap();
    assert_eq!(saved.status, Status::Success);
    assert_eq!(saved.summary.as_deref(), Some("Durable summary."));

    // Entry and exit messages landed in the conversation log
    let conv = db.get_conversation_by_thread("t-sqlite").unwrap().unwrap();
    let messages = db.list_messages(&conv.id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, "user");
    assert_eq!(messages[1].role, "assistant");
    assert_eq!(messages[1].content, "Durable summary.");
}

#[tokio::test]
async fn distinct_threads_run_concurrently() {
    let store = Arc::new(MemoryCheckpointStore::new());

    let make_engine = |store: Arc<MemoryCheckpointStore>| {
        Arc::new(WorkflowEngine::new(
            ScriptedGenerator::new(&["OK", RICH_REPORT, "Summary."]),
            store,
        ))
    };

    let a = make_engine(store.clone());
    let b = make_engine(store.clone());

    let (ra, rb) = tokio::join!(
        a.start(WorkflowState::new("u1", CONTRACT, "t-a")),
        b.start(WorkflowState::new("u2", CONTRACT, "t-b")),
    );

    assert!(matches!(ra, RunResult::Completed(_)));
    assert!(matches!(rb, RunResult::Completed(_)));
    assert!(store.get("t-a").unwrap().is_some());
    assert!(store.get("t-b").unwrap().is_some());
}
