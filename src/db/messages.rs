//! Message CRUD operations

use super::Database;
use crate::state::Role;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored conversation message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Database {
    /// Append a message to a conversation
    pub fn add_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            (&id, conversation_id, role.as_str(), content, now.to_rfc3339()),
        )
        .context("Failed to add message")?;

        conn.execute(
            "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
            (now.to_rfc3339(), conversation_id),
        )
        .context("Failed to touch conversation")?;

        Ok(StoredMessage {
            id,
            conversation_id: conversation_id.to_string(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: now,
        })
    }

    /// Append a message, addressed by thread id instead of conversation id
    pub fn add_thread_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<StoredMessage> {
        let conv = self
            .get_conversation_by_thread(thread_id)?
            .with_context(|| format!("No conversation for thread {}", thread_id))?;
        self.add_message(&conv.id, role, content)
    }

    /// All messages of a conversation, oldest first
    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<StoredMessage>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, conversation_id, role, content, created_at
            FROM messages
            WHERE conversation_id = ?1
            ORDER BY created_at ASC
            "#,
        )?;

        let messages = stmt
            .query_map([conversation_id], |row| {
                let created_at: String = row.get(4)?;
                Ok(StoredMessage {
                    id: row.get(0)?,
                    conversation_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }
}
