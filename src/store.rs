//! Persistent channel store.
//!
//! The store is the only component that touches durable storage. It owns
//! the `channel` table schema, loads registered channels at startup, and
//! accepts write-backs when a registered channel's topic or modes change.
//! Startup failures are fatal; runtime write failures are logged by the
//! caller and never affect in-memory state.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// One row of the `channel` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub name: String,
    /// Concatenated channel mode letters, e.g. `"nt"`.
    pub flags: String,
    /// Channel key; empty when unset.
    pub key: String,
    /// Channel topic; empty when unset.
    pub topic: String,
    pub user_limit: i64,
}

/// SQLite-backed store of registered channels.
#[derive(Clone)]
pub struct ChannelStore {
    pool: SqlitePool,
}

impl ChannelStore {
    /// Open (creating if needed) the database at `path` and ensure the
    /// schema exists. The literal path `:memory:` opens an in-memory
    /// database, used by tests.
    pub async fn open(path: &str) -> Result<ChannelStore, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        // A single connection keeps an in-memory database coherent and is
        // plenty for the write rate of channel registration.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS channel (
              name TEXT PRIMARY KEY,
              flags TEXT NOT NULL,
              key TEXT NOT NULL,
              topic TEXT NOT NULL,
              user_limit INTEGER NOT NULL)
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(ChannelStore { pool })
    }

    /// Load every registered channel.
    pub async fn load_channels(&self) -> Result<Vec<ChannelRecord>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, String, i64)>(
            "SELECT name, flags, key, topic, user_limit FROM channel",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, flags, key, topic, user_limit)| ChannelRecord {
                name,
                flags,
                key,
                topic,
                user_limit,
            })
            .collect())
    }

    /// Insert or update a registered channel.
    pub async fn save(&self, record: &ChannelRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO channel (name, flags, key, topic, user_limit)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
              flags = excluded.flags,
              key = excluded.key,
              topic = excluded.topic,
              user_limit = excluded.user_limit
            "#,
        )
        .bind(&record.name)
        .bind(&record.flags)
        .bind(&record.key)
        .bind(&record.topic)
        .bind(record.user_limit)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop a registered channel. Returns whether a row was removed.
    pub async fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM channel WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
