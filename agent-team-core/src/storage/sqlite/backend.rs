use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::config::schema::SqliteStorageConfig;
use crate::error::{Error, Result};
use crate::storage::model::{ActionLog, ConversationSummary, NewMessage, PersistedMessage};
use crate::storage::MessageStore;

const SCHEMA_V1: [&str; 9] = [
    "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL PRIMARY KEY)",
    "INSERT OR IGNORE INTO schema_version(version) VALUES (0)",
    "CREATE TABLE IF NOT EXISTS messages (seq INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL UNIQUE, thread_id TEXT NOT NULL, sender TEXT NOT NULL, recipient TEXT NOT NULL, content TEXT NOT NULL, role TEXT NOT NULL, metadata TEXT NOT NULL, created_at TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS agent_actions (seq INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL UNIQUE, agent_id TEXT NOT NULL, tool_name TEXT NOT NULL, input TEXT NOT NULL, output TEXT NOT NULL, status TEXT NOT NULL, created_at TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS conversation_summaries (seq INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL UNIQUE, agent_id TEXT NOT NULL, summary TEXT NOT NULL, created_at TEXT NOT NULL)",
    "CREATE INDEX IF NOT EXISTS idx_messages_thread_seq ON messages(thread_id, seq)",
    "CREATE INDEX IF NOT EXISTS idx_agent_actions_agent_id ON agent_actions(agent_id)",
    "CREATE INDEX IF NOT EXISTS idx_conversation_summaries_agent_id ON conversation_summaries(agent_id)",
    "UPDATE schema_version SET version = 1",
];

const SELECT_THREAD_MESSAGES: &str = "SELECT id, thread_id, sender, recipient, content, role, metadata, created_at FROM messages WHERE thread_id = ? ORDER BY seq DESC LIMIT ?";
const SELECT_ALL_MESSAGES: &str = "SELECT id, thread_id, sender, recipient, content, role, metadata, created_at FROM messages ORDER BY seq DESC LIMIT ?";

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
    initialized: std::sync::Arc<OnceCell<()>>,
}

impl SqliteStore {
    /// Builds a lazily connecting pool; tables are created on first use.
    pub fn new(
        connection_string: &str,
        pool_size: usize,
        sqlite: &SqliteStorageConfig,
    ) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|err| Error::Storage(format!("invalid SQLite connection string: {err}")))?
            .create_if_missing(true)
            .busy_timeout(Duration::from_millis(sqlite.busy_timeout_ms))
            .foreign_keys(sqlite.foreign_keys);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size.max(1) as u32)
            .connect_lazy_with(options);

        Ok(Self {
            pool,
            initialized: std::sync::Arc::new(OnceCell::new()),
        })
    }

    async fn ensure_initialized(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                for statement in SCHEMA_V1 {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(Error::from)
            .map(|_| ())
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(|err| Error::Storage(format!("failed to parse timestamp '{value}': {err}")))
    }

    /// Unreadable metadata is treated as empty rather than failing the read.
    fn parse_metadata(id: &str, raw: &str) -> Map<String, Value> {
        match serde_json::from_str::<Map<String, Value>>(raw) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(message_id = id, error = %err, "ignoring malformed message metadata");
                Map::new()
            }
        }
    }

    fn message_from_row(row: &SqliteRow) -> Result<PersistedMessage> {
        let id = row.get::<String, _>("id");
        let created_at = row.get::<String, _>("created_at");
        let metadata = Self::parse_metadata(&id, &row.get::<String, _>("metadata"));
        Ok(PersistedMessage {
            thread_id: row.get::<String, _>("thread_id"),
            sender: row.get::<String, _>("sender"),
            recipient: row.get::<String, _>("recipient"),
            content: row.get::<String, _>("content"),
            role: row.get::<String, _>("role"),
            metadata,
            created_at: Self::parse_timestamp(&created_at)?,
            id,
        })
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn save_message(&self, message: NewMessage) -> Result<PersistedMessage> {
        self.ensure_initialized().await?;

        let persisted = PersistedMessage::from_new(message);
        sqlx::query(
            "INSERT INTO messages(id, thread_id, sender, recipient, content, role, metadata, created_at) VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&persisted.id)
        .bind(&persisted.thread_id)
        .bind(&persisted.sender)
        .bind(&persisted.recipient)
        .bind(&persisted.content)
        .bind(&persisted.role)
        .bind(serde_json::to_string(&persisted.metadata)?)
        .bind(persisted.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(persisted)
    }

    async fn get_messages(
        &self,
        thread_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PersistedMessage>> {
        self.ensure_initialized().await?;

        let rows = if let Some(thread_id) = thread_id {
            sqlx::query(SELECT_THREAD_MESSAGES)
                .bind(thread_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(SELECT_ALL_MESSAGES)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
        };

        rows.iter().map(Self::message_from_row).collect()
    }

    async fn log_action(&self, action: ActionLog) -> Result<String> {
        self.ensure_initialized().await?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO agent_actions(id, agent_id, tool_name, input, output, status, created_at) VALUES(?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&action.agent_id)
        .bind(&action.tool_name)
        .bind(action.input.to_string())
        .bind(action.output.to_string())
        .bind(action.status.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn log_conversation(&self, agent_id: &str, summary: &str) -> Result<String> {
        self.ensure_initialized().await?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO conversation_summaries(id, agent_id, summary, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(agent_id)
        .bind(summary)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn recent_summaries(
        &self,
        agent_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>> {
        self.ensure_initialized().await?;

        let rows = sqlx::query(
            "SELECT id, agent_id, summary, created_at FROM conversation_summaries WHERE agent_id = ? ORDER BY seq DESC LIMIT ?",
        )
        .bind(agent_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let created_at = row.get::<String, _>("created_at");
            summaries.push(ConversationSummary {
                id: row.get::<String, _>("id"),
                agent_id: row.get::<String, _>("agent_id"),
                summary: row.get::<String, _>("summary"),
                created_at: Self::parse_timestamp(&created_at)?,
            });
        }

        Ok(summaries)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
