//! User and conversation CRUD operations

use super::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Conversation record, one per workflow thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Database {
    /// Look up a user by email, creating one if absent. Returns the user id.
    pub fn get_or_create_user(&self, email: &str) -> Result<String> {
        let conn = self.conn.lock().unwrap();

        let existing: Option<String> = conn
            .query_row("SELECT id FROM users WHERE email = ?1", [email], |row| {
                row.get(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;

        if let Some(id) = existing {
            return Ok(id);
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, email, created_at) VALUES (?1, ?2, ?3)",
            (&id, email, Utc::now().to_rfc3339()),
        )
        .context("Failed to create user")?;

        tracing::info!(user_id = %id, "Created user");
        Ok(id)
    }

    /// Conversation for a thread id, creating one if absent. Returns the
    /// conversation id.
    pub fn ensure_conversation(&self, user_id: &str, thread_id: &str) -> Result<String> {
        if let Some(conv) = self.get_conversation_by_thread(thread_id)? {
            return Ok(conv.id);
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO conversations (id, user_id, thread_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            (&id, user_id, thread_id, &now, &now),
        )
        .context("Failed to create conversation")?;

        tracing::info!(conversation_id = %id, thread_id, "Created conversation");
        Ok(id)
    }

    /// Get a conversation by its thread id
    pub fn get_conversation_by_thread(&self, thread_id: &str) -> Result<Option<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, thread_id, created_at, updated_at
            FROM conversations
            WHERE thread_id = ?1
            "#,
        )?;

        let result = stmt.query_row([thread_id], |row| {
            let created_at: String = row.get(3)?;
            let updated_at: String = row.get(4)?;

            Ok(Conversation {
                id: row.get(0)?,
                user_id: row.get(1)?,
                thread_id: row.get(2)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .unwrap()
                    .with_timezone(&Utc),
                updated_at: DateTime::parse_from_rfc3339(&updated_at)
                    .unwrap()
                    .with_timezone(&Utc),
            })
        });

        match result {
            Ok(conv) => Ok(Some(conv)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List a user's conversations, most recently updated first
    pub fn list_conversations_for_user(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, user_id, thread_id, created_at, updated_at
            FROM conversations
            WHERE user_id = ?1
            ORDER BY updated_at DESC
            "#,
        )?;

        let conversations = stmt
            .query_map([user_id], |row| {
                let created_at: String = row.get(3)?;
                let updated_at: String = row.get(4)?;

                Ok(Conversation {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    thread_id: row.get(2)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .unwrap()
                        .with_timezone(&Utc),
                    updated_at: DateTime::parse_from_rfc3339(&updated_at)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(conversations)
    }
}
