//! SQLite Task Repository
//!
//! 任务与句子整体读写；保存时在一个事务内替换全部句子

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{db_error, serialization_error};
use super::DbPool;
use crate::application::ports::{
    Page, PageRequest, RepositoryError, SentenceRecord, TaskRepositoryPort, TaskSummary,
};
use crate::domain::task::{
    AudioRef, Pause, Sentence, SentenceId, SentenceSynthesis, SynthesisStatus, Task, TaskId,
    TaskStatus, VoiceParams,
};
use crate::domain::BreakingStandard;

const SENTENCE_COLUMNS: &str = "id, task_id, ordinal, parent_id, content, \
    voice_id, speech_rate, volume, pitch, pauses, \
    synthesis_status, audio_key, audio_duration_ms, synthesis_error, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT t.id, t.status, t.standard, t.char_count, t.created_at, t.updated_at,
        (SELECT COUNT(*) FROM sentences s WHERE s.task_id = t.id) AS sentence_count,
        (SELECT COUNT(*) FROM sentences s
            WHERE s.task_id = t.id AND s.synthesis_status = 'succeeded') AS succeeded_count
    FROM tasks t
"#;

/// SQLite Task Repository
pub struct SqliteTaskRepository {
    pool: DbPool,
}

impl SqliteTaskRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(serialization_error)
}

pub(crate) fn parse_time(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(serialization_error)?
        .with_timezone(&Utc))
}

fn parse_status(s: &str) -> Result<TaskStatus, RepositoryError> {
    TaskStatus::from_str(s)
        .ok_or_else(|| RepositoryError::SerializationError(format!("unknown task status: {}", s)))
}

fn parse_standard(id: i64) -> Result<BreakingStandard, RepositoryError> {
    BreakingStandard::from_id(id as u8).map_err(serialization_error)
}

#[derive(FromRow)]
struct TaskRow {
    id: String,
    status: String,
    standard: i64,
    char_count: Option<i64>,
    created_at: String,
    updated_at: String,
}

#[derive(FromRow)]
struct SummaryRow {
    id: String,
    status: String,
    standard: i64,
    char_count: Option<i64>,
    created_at: String,
    updated_at: String,
    sentence_count: i64,
    succeeded_count: i64,
}

impl TryFrom<SummaryRow> for TaskSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(TaskSummary {
            id: TaskId::from_uuid(parse_uuid(&row.id)?),
            status: parse_status(&row.status)?,
            standard: parse_standard(row.standard)?,
            char_count: row.char_count.map(|c| c as usize),
            sentence_count: row.sentence_count as usize,
            succeeded_count: row.succeeded_count as usize,
            created_at: parse_time(&row.created_at)?,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct SentenceRow {
    id: String,
    task_id: String,
    ordinal: i64,
    parent_id: Option<String>,
    content: String,
    voice_id: Option<String>,
    speech_rate: i64,
    volume: i64,
    pitch: i64,
    pauses: String,
    synthesis_status: String,
    audio_key: Option<String>,
    audio_duration_ms: Option<i64>,
    synthesis_error: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<SentenceRow> for SentenceRecord {
    type Error = RepositoryError;

    fn try_from(row: SentenceRow) -> Result<Self, Self::Error> {
        let pauses: Vec<Pause> = serde_json::from_str(&row.pauses).map_err(serialization_error)?;
        let status = SynthesisStatus::from_str(&row.synthesis_status).ok_or_else(|| {
            RepositoryError::SerializationError(format!(
                "unknown synthesis status: {}",
                row.synthesis_status
            ))
        })?;

        Ok(SentenceRecord {
            ordinal: row.ordinal as usize,
            sentence: Sentence {
                id: SentenceId::from_uuid(parse_uuid(&row.id)?),
                task_id: TaskId::from_uuid(parse_uuid(&row.task_id)?),
                parent_id: row
                    .parent_id
                    .as_deref()
                    .map(parse_uuid)
                    .transpose()?
                    .map(SentenceId::from_uuid),
                content: row.content,
                voice: VoiceParams {
                    voice_id: row.voice_id,
                    speech_rate: row.speech_rate as i32,
                    volume: row.volume as i32,
                    pitch: row.pitch as i32,
                },
                pauses,
                synthesis: SentenceSynthesis {
                    status,
                    audio: row.audio_key.map(|key| AudioRef {
                        key,
                        duration_ms: row.audio_duration_ms.unwrap_or(0) as u64,
                    }),
                    error: row.synthesis_error,
                },
                created_at: parse_time(&row.created_at)?,
                updated_at: parse_time(&row.updated_at)?,
            },
        })
    }
}

#[async_trait]
impl TaskRepositoryPort for SqliteTaskRepository {
    async fn save(&self, task: &Task) -> Result<(), RepositoryError> {
        let task_id = task.id().to_string();
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, status, standard, char_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                standard = excluded.standard,
                char_count = excluded.char_count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&task_id)
        .bind(task.status().as_str())
        .bind(task.standard().id() as i64)
        .bind(task.char_count().map(|c| c as i64))
        .bind(task.created_at().to_rfc3339())
        .bind(task.updated_at().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // 整体替换句子序列
        sqlx::query("DELETE FROM sentences WHERE task_id = ?")
            .bind(&task_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        for (ordinal, sentence) in task.sentences().iter().enumerate() {
            let pauses = serde_json::to_string(&sentence.pauses).map_err(serialization_error)?;
            let audio = sentence.synthesis.audio.as_ref();

            sqlx::query(
                r#"
                INSERT INTO sentences (
                    id, task_id, ordinal, parent_id, content, voice_id, speech_rate, volume, pitch,
                    pauses, synthesis_status, audio_key, audio_duration_ms, synthesis_error,
                    created_at, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(sentence.id.to_string())
            .bind(&task_id)
            .bind(ordinal as i64)
            .bind(sentence.parent_id.map(|p| p.to_string()))
            .bind(&sentence.content)
            .bind(sentence.voice.voice_id.as_deref())
            .bind(sentence.voice.speech_rate as i64)
            .bind(sentence.voice.volume as i64)
            .bind(sentence.voice.pitch as i64)
            .bind(pauses)
            .bind(sentence.synthesis.status.as_str())
            .bind(audio.map(|a| a.key.as_str()))
            .bind(audio.map(|a| a.duration_ms as i64))
            .bind(sentence.synthesis.error.as_deref())
            .bind(sentence.created_at.to_rfc3339())
            .bind(sentence.updated_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;

        tracing::debug!(
            task_id = %task_id,
            sentences = task.sentence_count(),
            "Task saved"
        );
        Ok(())
    }

    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError> {
        let row: Option<TaskRow> = sqlx::query_as(
            "SELECT id, status, standard, char_count, created_at, updated_at \
             FROM tasks WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM sentences WHERE task_id = ? ORDER BY ordinal",
            SENTENCE_COLUMNS
        );
        let sentence_rows: Vec<SentenceRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let sentences = sentence_rows
            .into_iter()
            .map(|row| SentenceRecord::try_from(row).map(|r| r.sentence))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Task::restore(
            TaskId::from_uuid(parse_uuid(&row.id)?),
            parse_status(&row.status)?,
            parse_standard(row.standard)?,
            row.char_count.map(|c| c as usize),
            sentences,
            parse_time(&row.created_at)?,
            parse_time(&row.updated_at)?,
        )))
    }

    async fn find_summary(&self, id: TaskId) -> Result<Option<TaskSummary>, RepositoryError> {
        let sql = format!("{} WHERE t.id = ?", SUMMARY_SELECT);
        let row: Option<SummaryRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(TaskSummary::try_from).transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Page<TaskSummary>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let sql = format!("{} ORDER BY t.created_at DESC, t.id LIMIT ? OFFSET ?", SUMMARY_SELECT);
        let rows: Vec<SummaryRow> = sqlx::query_as(&sql)
            .bind(page.page_size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(TaskSummary::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            total: total as usize,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for sql in [
            "DELETE FROM rule_settings WHERE task_id = ?",
            "DELETE FROM reading_rules WHERE scope = 'task' AND task_id = ?",
            "DELETE FROM merges WHERE task_id = ?",
            "DELETE FROM sentences WHERE task_id = ?",
        ] {
            sqlx::query(sql)
                .bind(id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }

        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_task_id_by_sentence(
        &self,
        sentence_id: SentenceId,
    ) -> Result<Option<TaskId>, RepositoryError> {
        let task_id: Option<String> =
            sqlx::query_scalar("SELECT task_id FROM sentences WHERE id = ?")
                .bind(sentence_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        task_id
            .as_deref()
            .map(|id| parse_uuid(id).map(TaskId::from_uuid))
            .transpose()
    }

    async fn find_sentence(
        &self,
        sentence_id: SentenceId,
    ) -> Result<Option<SentenceRecord>, RepositoryError> {
        let sql = format!("SELECT {} FROM sentences WHERE id = ?", SENTENCE_COLUMNS);
        let row: Option<SentenceRow> = sqlx::query_as(&sql)
            .bind(sentence_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(SentenceRecord::try_from).transpose()
    }

    async fn list_sentences(
        &self,
        task_id: TaskId,
        page: PageRequest,
    ) -> Result<Page<SentenceRecord>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sentences WHERE task_id = ?")
            .bind(task_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        let sql = format!(
            "SELECT {} FROM sentences WHERE task_id = ? ORDER BY ordinal LIMIT ? OFFSET ?",
            SENTENCE_COLUMNS
        );
        let rows: Vec<SentenceRow> = sqlx::query_as(&sql)
            .bind(task_id.to_string())
            .bind(page.page_size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(Page {
            items: rows
                .into_iter()
                .map(SentenceRecord::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            total: total as usize,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn save_synthesis(
        &self,
        sentence_id: SentenceId,
        synthesis: &SentenceSynthesis,
    ) -> Result<bool, RepositoryError> {
        let audio = synthesis.audio.as_ref();
        let result = sqlx::query(
            r#"
            UPDATE sentences SET
                synthesis_status = ?,
                audio_key = ?,
                audio_duration_ms = ?,
                synthesis_error = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(synthesis.status.as_str())
        .bind(audio.map(|a| a.key.as_str()))
        .bind(audio.map(|a| a.duration_ms as i64))
        .bind(synthesis.error.as_deref())
        .bind(Utc::now().to_rfc3339())
        .bind(sentence_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn fail_active_synthesis(&self, reason: &str) -> Result<usize, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE sentences SET synthesis_status = 'failed', synthesis_error = ?, updated_at = ?
            WHERE synthesis_status IN ('queued', 'running')
            "#,
        )
        .bind(reason)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() as usize)
    }
}
