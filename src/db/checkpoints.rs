//! SQLite-backed checkpoint store

use chrono::Utc;

use super::Database;
use crate::checkpoint::{CheckpointStore, PersistenceError};
use crate::state::WorkflowState;

/// Durable `CheckpointStore` over the `checkpoints` table.
///
/// One row per thread, JSON snapshot column, upsert on conflict. No
/// optimistic concurrency: last write wins, per the engine's per-thread
/// serialization guarantee.
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    db: Database,
}

impl SqliteCheckpointStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn get(&self, thread_id: &str) -> Result<Option<WorkflowState>, PersistenceError> {
        let conn = self.db.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT snapshot FROM checkpoints WHERE thread_id = ?1",
            [thread_id],
            |row| row.get::<_, String>(0),
        );

        let snapshot = match result {
            Ok(json) => json,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: WorkflowState = serde_json::from_str(&snapshot)?;
        Ok(Some(state))
    }

    fn save(&self, thread_id: &str, state: &WorkflowState) -> Result<(), PersistenceError> {
        let snapshot = serde_json::to_string(state)?;
        let now = Utc::now().to_rfc3339();

        let conn = self.db.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO checkpoints (thread_id, snapshot, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(thread_id) DO UPDATE
              SET snapshot = excluded.snapshot, updated_at = excluded.updated_at
            "#,
            (thread_id, &snapshot, &now),
        )?;

        tracing::debug!(thread_id, "Checkpoint saved");
        Ok(())
    }

    fn delete(&self, thread_id: &str) -> Result<(), PersistenceError> {
        let conn = self.db.conn.lock().unwrap();
        conn.execute("DELETE FROM checkpoints WHERE thread_id = ?1", [thread_id])?;
        tracing::info!(thread_id, "Checkpoint deleted");
        Ok(())
    }
}
