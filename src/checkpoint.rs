//! Durable checkpointing of workflow state
//!
//! One snapshot per thread id, latest-write-wins. The engine persists
//! after every stage transition; a persistence failure converts the
//! in-flight run to failed rather than continuing with unsaved state.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::state::WorkflowState;

/// Checkpoint read/write failure
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}

/// One operation in a checkpoint write batch
#[derive(Debug, Clone)]
pub enum CheckpointOp {
    Save(WorkflowState),
    Delete,
    /// Untyped payload from an external writer; interpreted flexibly and
    /// skipped with a warning when unrecognized
    Raw(serde_json::Value),
}

/// Keyed persistence of `WorkflowState` snapshots
pub trait CheckpointStore: Send + Sync {
    /// Latest snapshot for the thread, or `None` if never saved
    fn get(&self, thread_id: &str) -> Result<Option<WorkflowState>, PersistenceError>;

    /// Idempotent upsert, last-write-wins
    fn save(&self, thread_id: &str, state: &WorkflowState) -> Result<(), PersistenceError>;

    fn delete(&self, thread_id: &str) -> Result<(), PersistenceError>;

    /// Apply a batch of operations in order.
    ///
    /// Malformed or unrecognized operations are logged and skipped; they
    /// never abort the rest of the batch.
    fn apply_batch(
        &self,
        thread_id: &str,
        ops: Vec<CheckpointOp>,
    ) -> Result<(), PersistenceError> {
        for (idx, op) in ops.into_iter().enumerate() {
            match op {
                CheckpointOp::Save(state) => self.save(thread_id, &state)?,
                CheckpointOp::Delete => self.delete(thread_id)?,
                CheckpointOp::Raw(value) => match interpret_raw_op(value) {
                    Some(CheckpointOp::Save(state)) => self.save(thread_id, &state)?,
                    Some(CheckpointOp::Delete) => self.delete(thread_id)?,
                    _ => {
                        tracing::warn!(thread_id, idx, "Skipping unrecognized checkpoint op");
                    }
                },
            }
        }
        Ok(())
    }
}

/// Shape of an untyped write descriptor: `{"op": "save", "checkpoint": {..}}`
#[derive(Debug, Deserialize, Serialize)]
struct RawOpDescriptor {
    op: Option<String>,
    checkpoint: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
}

/// Best-effort interpretation of an untyped batch item.
///
/// Accepts `{"op": "delete"}`, `{"op": "save"|"upsert"|"write"|"checkpoint",
/// "checkpoint"|"data": {..}}`, or a bare snapshot object.
fn interpret_raw_op(value: serde_json::Value) -> Option<CheckpointOp> {
    if !value.is_object() {
        return None;
    }

    let descriptor: RawOpDescriptor = serde_json::from_value(value.clone()).ok()?;
    match descriptor.op.as_deref().map(str::to_lowercase).as_deref() {
        Some("delete") => Some(CheckpointOp::Delete),
        Some("save") | Some("upsert") | Some("write") | Some("checkpoint") => {
            let payload = descriptor.checkpoint.or(descriptor.data)?;
            let state: WorkflowState = serde_json::from_value(payload).ok()?;
            Some(CheckpointOp::Save(state))
        }
        Some(_) => None,
        // No op field at all: treat the object itself as a snapshot
        None => {
            let state: WorkflowState = serde_json::from_value(value).ok()?;
            Some(CheckpointOp::Save(state))
        }
    }
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryCheckpointStore {
    snapshots: Mutex<HashMap<String, WorkflowState>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, thread_id: &str) -> Result<Option<WorkflowState>, PersistenceError> {
        Ok(self.snapshots.lock().unwrap().get(thread_id).cloned())
    }

    fn save(&self, thread_id: &str, state: &WorkflowState) -> Result<(), PersistenceError> {
        tracing::debug!(thread_id, "Saving checkpoint (memory)");
        self.snapshots
            .lock()
            .unwrap()
            .insert(thread_id.to_string(), state.clone());
        Ok(())
    }

    fn delete(&self, thread_id: &str) -> Result<(), PersistenceError> {
        self.snapshots.lock().unwrap().remove(thread_id);
        Ok(())
    }
}
