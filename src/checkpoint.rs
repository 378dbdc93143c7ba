//! [`CheckpointStore`] implementations: an in-memory store for tests, a
//! file-based store for single-node deployments, and a SQLite-backed store
//! for anything that needs durability across process restarts (§6).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use crate::error::{PipelineError, Result};
use crate::ports::{Checkpoint, CheckpointStore};

/// Keeps the latest checkpoint per run in process memory. Used by tests and
/// by single-shot CLI invocations that never need to resume.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Mutex<HashMap<String, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.checkpoints
            .lock()
            .unwrap()
            .insert(checkpoint.run_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.lock().unwrap().get(run_id).cloned())
    }

    async fn delete(&self, run_id: &str) -> Result<()> {
        self.checkpoints.lock().unwrap().remove(run_id);
        Ok(())
    }
}

/// Serializes each run's latest checkpoint to `<dir>/<run_id>.json`. Simple
/// and durable enough for a single-process deployment without a database.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, run_id: &str) -> PathBuf {
        self.dir.join(format!("{run_id}.json"))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_vec_pretty(checkpoint)?;
        tokio::fs::write(self.path_for(&checkpoint.run_id), json).await?;
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>> {
        match tokio::fs::read(self.path_for(run_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PipelineError::from(e)),
        }
    }

    async fn delete(&self, run_id: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(run_id)).await {
            Ok(()) | Err(_) => Ok(()),
        }
    }
}

/// SQLite-backed checkpoint store for deployments that want checkpoint
/// history queryable alongside other run metadata.
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
}

impl SqliteCheckpointStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // A single connection keeps `sqlite::memory:` URLs (used in tests)
        // pointed at one in-memory database instead of one per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS checkpoints (
                run_id TEXT PRIMARY KEY,
                state_json TEXT NOT NULL,
                taken_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let state_json = serde_json::to_string(&checkpoint.state)?;
        sqlx::query(
            "INSERT INTO checkpoints (run_id, state_json, taken_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(run_id) DO UPDATE SET state_json = excluded.state_json, taken_at = excluded.taken_at",
        )
        .bind(&checkpoint.run_id)
        .bind(state_json)
        .bind(checkpoint.taken_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, run_id: &str) -> Result<Option<Checkpoint>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT state_json, taken_at FROM checkpoints WHERE run_id = ?1")
                .bind(run_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Ok(None),
            Some((state_json, taken_at)) => {
                let state = serde_json::from_str(&state_json)?;
                let taken_at = chrono::DateTime::parse_from_rfc3339(&taken_at)
                    .map_err(|e| PipelineError::Internal(format!("corrupt checkpoint timestamp: {e}")))?
                    .with_timezone(&chrono::Utc);
                Ok(Some(Checkpoint {
                    run_id: run_id.to_string(),
                    state,
                    taken_at,
                }))
            }
        }
    }

    async fn delete(&self, run_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE run_id = ?1")
            .bind(run_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ExecutionState;
    use chrono::Utc;

    fn sample_checkpoint() -> Checkpoint {
        Checkpoint {
            run_id: "run-1".into(),
            state: ExecutionState::new("run-1", Utc::now()),
            taken_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_round_trips() {
        let store = InMemoryCheckpointStore::new();
        let checkpoint = sample_checkpoint();
        store.save(&checkpoint).await.unwrap();
        let loaded = store.load("run-1").await.unwrap().unwrap();
        assert_eq!(loaded.run_id, "run-1");
        store.delete("run-1").await.unwrap();
        assert!(store.load("run-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointStore::new(dir.path());
        let checkpoint = sample_checkpoint();
        store.save(&checkpoint).await.unwrap();
        let loaded = store.load("run-1").await.unwrap().unwrap();
        assert_eq!(loaded.run_id, "run-1");
    }

    #[tokio::test]
    async fn sqlite_store_round_trips() {
        let store = SqliteCheckpointStore::connect("sqlite::memory:").await.unwrap();
        let checkpoint = sample_checkpoint();
        store.save(&checkpoint).await.unwrap();
        let loaded = store.load("run-1").await.unwrap().unwrap();
        assert_eq!(loaded.run_id, "run-1");
        store.delete("run-1").await.unwrap();
        assert!(store.load("run-1").await.unwrap().is_none());
    }
}
