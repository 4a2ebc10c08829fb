//! SQLite-backed session store.

use crate::config::StorageConfig;
use crate::store::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relay_core::{
    ChatMessage, ChatSession, Error, MessageStatus, Result, SessionFilter, SessionPatch,
    SessionStatus,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

/// Durable session store backed by SQLite via sqlx.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> Error {
    Error::storage(e.to_string())
}

impl SqliteStore {
    /// Open (creating if missing) the database at the configured path.
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        let in_memory = config.path == ":memory:";

        if !in_memory {
            if let Some(parent) = std::path::Path::new(&config.path).parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::storage(format!("create database dir: {e}")))?;
                }
            }
        }

        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{}", config.path)
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(db_err)?
            .create_if_missing(true);

        // Each in-memory connection is a separate database; a pool of one
        // keeps all reads and writes on the same database.
        let max_connections = if in_memory { 1 } else { config.max_connections };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        Ok(Self { pool })
    }

    /// Initialize the schema. One statement per call; sqlx prepares each
    /// query individually.
    pub async fn init(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                customer_name TEXT NOT NULL,
                customer_email TEXT NOT NULL,
                status TEXT NOT NULL,
                assigned_to TEXT,
                unread_count INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                last_message_at DATETIME NOT NULL,
                ended_at DATETIME,
                dispute_id TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_sessions_status ON chat_sessions(status, last_message_at DESC)",
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                text TEXT NOT NULL,
                is_user INTEGER NOT NULL,
                status TEXT NOT NULL,
                timestamp DATETIME NOT NULL,
                connection_id TEXT,
                admin_id TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_messages_session_timestamp ON chat_messages(session_id, timestamp)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }

        Ok(())
    }

    fn session_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatSession> {
        let status_str: String = row.try_get("status").map_err(db_err)?;
        let status = SessionStatus::parse(&status_str)
            .ok_or_else(|| Error::storage(format!("invalid session status: {status_str}")))?;

        Ok(ChatSession {
            id: row.try_get("id").map_err(db_err)?,
            customer_name: row.try_get("customer_name").map_err(db_err)?,
            customer_email: row.try_get("customer_email").map_err(db_err)?,
            status,
            assigned_to: row.try_get("assigned_to").map_err(db_err)?,
            unread_count: row.try_get("unread_count").map_err(db_err)?,
            created_at: row.try_get("created_at").map_err(db_err)?,
            last_message_at: row.try_get("last_message_at").map_err(db_err)?,
            ended_at: row.try_get("ended_at").map_err(db_err)?,
            dispute_id: row.try_get("dispute_id").map_err(db_err)?,
        })
    }

    fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage> {
        let status_str: String = row.try_get("status").map_err(db_err)?;
        let status = MessageStatus::parse(&status_str)
            .ok_or_else(|| Error::storage(format!("invalid message status: {status_str}")))?;

        Ok(ChatMessage {
            id: row.try_get("id").map_err(db_err)?,
            session_id: row.try_get("session_id").map_err(db_err)?,
            text: row.try_get("text").map_err(db_err)?,
            is_user: row.try_get("is_user").map_err(db_err)?,
            status,
            timestamp: row.try_get("timestamp").map_err(db_err)?,
            connection_id: row.try_get("connection_id").map_err(db_err)?,
            admin_id: row.try_get("admin_id").map_err(db_err)?,
        })
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, session: &ChatSession) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions
                (id, customer_name, customer_email, status, assigned_to,
                 unread_count, created_at, last_message_at, ended_at, dispute_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.customer_name)
        .bind(&session.customer_email)
        .bind(session.status.as_str())
        .bind(&session.assigned_to)
        .bind(session.unread_count)
        .bind(session.created_at)
        .bind(session.last_message_at)
        .bind(session.ended_at)
        .bind(&session.dispute_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn find_session(&self, id: &str) -> Result<Option<ChatSession>> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(Self::session_from_row).transpose()
    }

    async fn touch_session(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE chat_sessions SET last_message_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn record_message(
        &self,
        session_id: &str,
        at: DateTime<Utc>,
        from_visitor: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE chat_sessions
            SET last_message_at = ?,
                unread_count = unread_count + CASE WHEN ? THEN 1 ELSE 0 END
            WHERE id = ?
            "#,
        )
        .bind(at)
        .bind(from_visitor)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn assign_operator(&self, session_id: &str, admin_id: &str) -> Result<()> {
        sqlx::query("UPDATE chat_sessions SET assigned_to = ?, unread_count = 0 WHERE id = ?")
            .bind(admin_id)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn close_session(&self, session_id: &str, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE chat_sessions SET status = 'closed', ended_at = ? WHERE id = ?")
            .bind(at)
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn update_session(&self, id: &str, patch: &SessionPatch) -> Result<Option<ChatSession>> {
        if patch.is_empty() {
            return self.find_session(id).await;
        }

        let result = sqlx::query(
            r#"
            UPDATE chat_sessions
            SET status = COALESCE(?, status),
                assigned_to = COALESCE(?, assigned_to),
                dispute_id = COALESCE(?, dispute_id)
            WHERE id = ?
            "#,
        )
        .bind(patch.status.map(|s| s.as_str()))
        .bind(&patch.assigned_to)
        .bind(&patch.dispute_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_session(id).await
    }

    async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<ChatSession>> {
        let mut builder = sqlx::QueryBuilder::new("SELECT * FROM chat_sessions WHERE 1 = 1");

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(assigned) = &filter.assigned_to {
            builder
                .push(" AND assigned_to = ")
                .push_bind(assigned.clone());
        }
        builder.push(" ORDER BY last_message_at DESC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(Self::session_from_row).collect()
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages
                (id, session_id, text, is_user, status, timestamp, connection_id, admin_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.session_id)
        .bind(&message.text)
        .bind(message.is_user)
        .bind(message.status.as_str())
        .bind(message.timestamp)
        .bind(&message.connection_id)
        .bind(&message.admin_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn session_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT * FROM chat_messages WHERE session_id = ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(Self::message_from_row).collect()
    }

    async fn mark_read(&self, session_id: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE chat_messages SET status = 'read' WHERE session_id = ? AND status != 'read'",
        )
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(result.rows_affected())
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
