use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::core::errors::ApiError;

/// Ordered list of chat turns ("You: ..." / "Bot: ...") keyed by session.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl HistoryStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(connect_options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool };
        store.init_db().await?;
        Ok(store)
    }

    async fn init_db(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS history_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_key TEXT NOT NULL,
                entry TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_history_entries_session
             ON history_entries(session_key, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    pub async fn append(&self, session_key: &str, entry: &str) -> Result<(), ApiError> {
        sqlx::query("INSERT INTO history_entries (session_key, entry, created_at) VALUES (?, ?, ?)")
            .bind(session_key)
            .bind(entry)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(())
    }

    /// Entries in insertion order. An unknown key reads as empty.
    pub async fn read_all(&self, session_key: &str) -> Result<Vec<String>, ApiError> {
        sqlx::query_scalar("SELECT entry FROM history_entries WHERE session_key = ? ORDER BY id")
            .bind(session_key)
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)
    }

    pub async fn clear(&self, session_key: &str) -> Result<u64, ApiError> {
        let result = sqlx::query("DELETE FROM history_entries WHERE session_key = ?")
            .bind(session_key)
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("newsrag-history-{}.db", uuid::Uuid::new_v4()))
    }

    async fn temp_store() -> HistoryStore {
        HistoryStore::new(temp_db()).await.unwrap()
    }

    #[tokio::test]
    async fn entries_come_back_in_append_order() {
        let store = temp_store().await;
        store.append("chat_history", "You: first").await.unwrap();
        store.append("chat_history", "Bot: one").await.unwrap();
        store.append("chat_history", "You: second").await.unwrap();

        assert_eq!(
            store.read_all("chat_history").await.unwrap(),
            vec!["You: first", "Bot: one", "You: second"]
        );
    }

    #[tokio::test]
    async fn keys_are_isolated() {
        let store = temp_store().await;
        store.append("a", "You: hi").await.unwrap();
        store.append("b", "You: hello").await.unwrap();

        assert_eq!(store.read_all("a").await.unwrap(), vec!["You: hi"]);
        assert!(store.read_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_removes_the_key() {
        let store = temp_store().await;
        store.append("chat_history", "You: q").await.unwrap();
        store.append("chat_history", "Bot: a").await.unwrap();
        store.append("other", "You: keep").await.unwrap();

        assert_eq!(store.clear("chat_history").await.unwrap(), 2);
        assert!(store.read_all("chat_history").await.unwrap().is_empty());
        assert_eq!(store.clear("chat_history").await.unwrap(), 0);
        assert_eq!(store.read_all("other").await.unwrap(), vec!["You: keep"]);
    }

    #[tokio::test]
    async fn entries_survive_reopen() {
        let path = temp_db();
        {
            let store = HistoryStore::new(path.clone()).await.unwrap();
            store.append("chat_history", "You: persisted").await.unwrap();
        }
        let store = HistoryStore::new(path).await.unwrap();
        assert_eq!(store.read_all("chat_history").await.unwrap(), vec!["You: persisted"]);
    }
}
