//! Tutor chat sessions and their messages.

use chrono::Utc;

use lex_core::entities::{ChatSession, Message};
use lex_core::enums::ChatRole;
use lex_core::identity::AuthIdentity;
use lex_core::ids::{PREFIX_CHAT_SESSION, PREFIX_MESSAGE};
use lex_core::responses::{ChatSessionDetail, Page};

use crate::error::DatabaseError;
use crate::helpers::{collect_rows, format_datetime, parse_datetime, parse_enum, require_text};
use crate::paging::Paging;
use crate::service::LexService;

const SESSION_COLS: &str = "id, owner_id, title, created_at, updated_at";
const MESSAGE_COLS: &str = "id, session_id, role, content, created_at";

/// Titles longer than this are cut when derived from a first message.
pub const MAX_TITLE_CHARS: usize = 60;

fn row_to_session(row: &libsql::Row) -> Result<ChatSession, DatabaseError> {
    Ok(ChatSession {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_datetime(&row.get::<String>(3)?)?,
        updated_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

fn row_to_message(row: &libsql::Row) -> Result<Message, DatabaseError> {
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: parse_enum(&row.get::<String>(2)?)?,
        content: row.get(3)?,
        created_at: parse_datetime(&row.get::<String>(4)?)?,
    })
}

impl LexService {
    /// Start a session. A blank title becomes "New chat".
    pub async fn create_chat_session(
        &self,
        owner_id: &str,
        title: Option<&str>,
    ) -> Result<ChatSession, DatabaseError> {
        let title: String = match title.map(str::trim) {
            Some(t) if !t.is_empty() => t.chars().take(MAX_TITLE_CHARS).collect(),
            _ => "New chat".to_string(),
        };

        let _guard = self.write_lock().await;
        let id = self.db().generate_id(PREFIX_CHAT_SESSION).await?;
        let now = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO chat_sessions (id, owner_id, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                libsql::params![id.as_str(), owner_id, title.as_str(), format_datetime(&now)],
            )
            .await?;
        Ok(ChatSession {
            id,
            owner_id: owner_id.to_string(),
            title,
            created_at: now,
            updated_at: now,
        })
    }

    /// Most recently active first.
    pub async fn list_chat_sessions(
        &self,
        owner_id: &str,
        paging: Paging,
    ) -> Result<Page<ChatSession>, DatabaseError> {
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM chat_sessions WHERE owner_id = ?1",
                [owner_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SESSION_COLS} FROM chat_sessions WHERE owner_id = ?1
                     ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![owner_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_session).await?, total))
    }

    /// Load a session owned by `identity`. Admins do not read other people's chats.
    pub async fn get_chat_session(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<ChatSession, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLS} FROM chat_sessions WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("chat session", id))?;
        let session = row_to_session(&row)?;
        if session.owner_id != identity.account_id {
            return Err(DatabaseError::forbidden("not your chat session"));
        }
        Ok(session)
    }

    pub async fn get_chat_session_detail(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<ChatSessionDetail, DatabaseError> {
        let session = self.get_chat_session(identity, id).await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM messages WHERE session_id = ?1
                     ORDER BY created_at, rowid"
                ),
                [id],
            )
            .await?;
        let messages = collect_rows(rows, row_to_message).await?;
        Ok(ChatSessionDetail { session, messages })
    }

    pub async fn delete_chat_session(
        &self,
        identity: &AuthIdentity,
        id: &str,
    ) -> Result<(), DatabaseError> {
        self.get_chat_session(identity, id).await?;
        let _guard = self.write_lock().await;
        self.conn()
            .execute("DELETE FROM chat_sessions WHERE id = ?1", [id])
            .await?;
        Ok(())
    }

    /// Store a message and bump the session's activity time.
    pub async fn append_message(
        &self,
        session_id: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<Message, DatabaseError> {
        let content = require_text("content", content)?;
        let now = Utc::now();
        let stamp = format_datetime(&now);

        let tx = self.begin_write().await?;
        let result = async {
            let id = self.db().generate_id(PREFIX_MESSAGE).await?;
            self.conn()
                .execute(
                    "INSERT INTO messages (id, session_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    libsql::params![
                        id.as_str(),
                        session_id,
                        role.as_str(),
                        content.as_str(),
                        stamp.as_str()
                    ],
                )
                .await?;
            let touched = self
                .conn()
                .execute(
                    "UPDATE chat_sessions SET updated_at = ?2 WHERE id = ?1",
                    [session_id, stamp.as_str()],
                )
                .await?;
            if touched == 0 {
                return Err(DatabaseError::not_found("chat session", session_id));
            }
            Ok(id)
        }
        .await;
        let id = tx.finish(result).await?;

        Ok(Message {
            id,
            session_id: session_id.to_string(),
            role,
            content,
            created_at: now,
        })
    }

    /// The last `limit` messages of a session in chronological order.
    pub async fn recent_messages(
        &self,
        session_id: &str,
        limit: u32,
    ) -> Result<Vec<Message>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM (
                        SELECT {MESSAGE_COLS}, rowid AS seq FROM messages WHERE session_id = ?1
                        ORDER BY created_at DESC, rowid DESC LIMIT ?2
                     ) ORDER BY created_at, seq"
                ),
                libsql::params![session_id, i64::from(limit)],
            )
            .await?;
        collect_rows(rows, row_to_message).await
    }

    /// Page through a session's messages, oldest first.
    pub async fn list_messages(
        &self,
        identity: &AuthIdentity,
        session_id: &str,
        paging: Paging,
    ) -> Result<Page<Message>, DatabaseError> {
        self.get_chat_session(identity, session_id).await?;
        let total = self
            .query_count(
                "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
                [session_id],
            )
            .await?;
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {MESSAGE_COLS} FROM messages WHERE session_id = ?1
                     ORDER BY created_at, rowid LIMIT ?2 OFFSET ?3"
                ),
                libsql::params![session_id, paging.limit(), paging.offset()],
            )
            .await?;
        Ok(paging.page(collect_rows(rows, row_to_message).await?, total))
    }
}
