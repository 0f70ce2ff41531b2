//! SQLite Merge Repository

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{db_error, serialization_error};
use super::task_repo::{parse_time, parse_uuid};
use super::DbPool;
use crate::application::ports::{MergeJob, MergeRepositoryPort, MergeState, RepositoryError};
use crate::domain::task::{SentenceId, TaskId};

const MERGE_COLUMNS: &str =
    "id, task_id, sentence_ids, state, audio_key, duration_ms, error, created_at, updated_at";

/// SQLite Merge Repository
pub struct SqliteMergeRepository {
    pool: DbPool,
}

impl SqliteMergeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct MergeRow {
    id: String,
    task_id: String,
    sentence_ids: String,
    state: String,
    audio_key: Option<String>,
    duration_ms: Option<i64>,
    error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<MergeRow> for MergeJob {
    type Error = RepositoryError;

    fn try_from(row: MergeRow) -> Result<Self, Self::Error> {
        let sentence_ids: Vec<SentenceId> =
            serde_json::from_str(&row.sentence_ids).map_err(serialization_error)?;

        Ok(MergeJob {
            id: parse_uuid(&row.id)?,
            task_id: TaskId::from_uuid(parse_uuid(&row.task_id)?),
            sentence_ids,
            state: MergeState::from_str(&row.state).ok_or_else(|| {
                RepositoryError::SerializationError(format!("unknown merge state: {}", row.state))
            })?,
            audio_key: row.audio_key,
            duration_ms: row.duration_ms.map(|d| d as u64),
            error: row.error,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl MergeRepositoryPort for SqliteMergeRepository {
    async fn save(&self, job: &MergeJob) -> Result<(), RepositoryError> {
        let sentence_ids = serde_json::to_string(&job.sentence_ids).map_err(serialization_error)?;

        sqlx::query(
            r#"
            INSERT INTO merges
                (id, task_id, sentence_ids, state, audio_key, duration_ms, error,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                audio_key = excluded.audio_key,
                duration_ms = excluded.duration_ms,
                error = excluded.error,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.task_id.to_string())
        .bind(sentence_ids)
        .bind(job.state.as_str())
        .bind(job.audio_key.as_deref())
        .bind(job.duration_ms.map(|d| d as i64))
        .bind(job.error.as_deref())
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MergeJob>, RepositoryError> {
        let sql = format!("SELECT {} FROM merges WHERE id = ?", MERGE_COLUMNS);
        let row: Option<MergeRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(MergeJob::try_from).transpose()
    }

    async fn list_by_task(&self, task_id: TaskId) -> Result<Vec<MergeJob>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM merges WHERE task_id = ? ORDER BY created_at DESC",
            MERGE_COLUMNS
        );
        let rows: Vec<MergeRow> = sqlx::query_as(&sql)
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(MergeJob::try_from).collect()
    }

    async fn find_active_by_task(&self, task_id: TaskId) -> Result<Vec<MergeJob>, RepositoryError> {
        let sql = format!(
            "SELECT {} FROM merges \
             WHERE task_id = ? AND state IN ('queued', 'running') ORDER BY created_at",
            MERGE_COLUMNS
        );
        let rows: Vec<MergeRow> = sqlx::query_as(&sql)
            .bind(task_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.into_iter().map(MergeJob::try_from).collect()
    }

    async fn fail_active(&self, reason: &str) -> Result<usize, RepositoryError> {
        let result = sqlx::query(
            "UPDATE merges SET state = 'failed', error = ?, updated_at = ? \
             WHERE state IN ('queued', 'running')",
        )
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn setup() -> SqliteMergeRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteMergeRepository::new(pool)
    }

    #[tokio::test]
    async fn test_save_updates_state() {
        let repo = setup().await;
        let task_id = TaskId::new();
        let ids = vec![SentenceId::new(), SentenceId::new()];
        let mut job = MergeJob::new(task_id, ids.clone());
        repo.save(&job).await.unwrap();

        assert_eq!(repo.find_active_by_task(task_id).await.unwrap().len(), 1);

        job.start();
        job.succeed("merge:x:y".to_string(), 4200);
        repo.save(&job).await.unwrap();

        let loaded = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, MergeState::Succeeded);
        assert_eq!(loaded.sentence_ids, ids);
        assert_eq!(loaded.audio_key.as_deref(), Some("merge:x:y"));
        assert_eq!(loaded.duration_ms, Some(4200));
        assert!(repo.find_active_by_task(task_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fail_active_and_delete() {
        let repo = setup().await;
        let task_id = TaskId::new();
        let job = MergeJob::new(task_id, vec![SentenceId::new()]);
        repo.save(&job).await.unwrap();

        assert_eq!(repo.fail_active("服务重启").await.unwrap(), 1);
        let loaded = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.state, MergeState::Failed);
        assert_eq!(loaded.error.as_deref(), Some("服务重启"));

        assert_eq!(repo.list_by_task(task_id).await.unwrap().len(), 1);
    }
}
