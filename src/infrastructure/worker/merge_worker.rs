//! Merge Worker - Background Audio Merge Processor

use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::application::ports::{
    content_hash, merge_key, AudioMergerPort, AudioMetadata, AudioStorePort, MergeJob,
    MergeRepositoryPort, MergeState, MergedAudio, TaskLockPort, TaskRepositoryPort,
};
use crate::infrastructure::events::EventPublisher;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct MergeWorkerConfig {
    /// 最大并发合并数
    pub max_concurrent: usize,
}

impl Default for MergeWorkerConfig {
    fn default() -> Self {
        Self { max_concurrent: 2 }
    }
}

/// 拼接产物概要
struct MergeSummary {
    duration_ms: u64,
    sample_rate: u32,
}

struct MergeContext {
    merge_repo: Arc<dyn MergeRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    locks: Arc<dyn TaskLockPort>,
    audio_store: Arc<dyn AudioStorePort>,
    merger: Arc<dyn AudioMergerPort>,
    event_publisher: Arc<EventPublisher>,
}

/// 合并 Worker
pub struct MergeWorker {
    max_concurrent: usize,
    queue_receiver: mpsc::Receiver<MergeJob>,
    context: Arc<MergeContext>,
}

impl MergeWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: MergeWorkerConfig,
        queue_receiver: mpsc::Receiver<MergeJob>,
        merge_repo: Arc<dyn MergeRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        locks: Arc<dyn TaskLockPort>,
        audio_store: Arc<dyn AudioStorePort>,
        merger: Arc<dyn AudioMergerPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            queue_receiver,
            context: Arc::new(MergeContext {
                merge_repo,
                task_repo,
                locks,
                audio_store,
                merger,
                event_publisher,
            }),
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(max_concurrent = self.max_concurrent, "MergeWorker started");

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        while let Some(job) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to acquire semaphore permit");
                    continue;
                }
            };

            let context = self.context.clone();
            tokio::spawn(async move {
                let _permit = permit;
                context.process_job(job).await;
            });
        }

        tracing::info!("MergeWorker stopped");
    }
}

impl MergeContext {
    async fn process_job(&self, mut job: MergeJob) {
        job.start();
        if !self.persist(&mut job).await {
            return;
        }
        self.event_publisher
            .publish_merge_state(job.task_id, job.id, MergeState::Running, None, None);

        match self.assemble(&job).await {
            Ok((key, merged)) => {
                job.succeed(key.clone(), merged.duration_ms);
                if !self.persist(&mut job).await {
                    if let Err(e) = self.audio_store.remove(&key).await {
                        tracing::warn!(
                            merge_id = %job.id,
                            error = %e,
                            "Failed to remove merged audio"
                        );
                    }
                    return;
                }
                self.mark_task_merged(&job).await;
                self.event_publisher.publish_merge_state(
                    job.task_id,
                    job.id,
                    MergeState::Succeeded,
                    Some(merged.duration_ms),
                    None,
                );
                tracing::info!(
                    merge_id = %job.id,
                    task_id = %job.task_id,
                    sentences = job.sentence_ids.len(),
                    duration_ms = merged.duration_ms,
                    sample_rate = merged.sample_rate,
                    "Merge completed"
                );
            }
            Err(reason) => {
                tracing::error!(
                    merge_id = %job.id,
                    task_id = %job.task_id,
                    error = %reason,
                    "Merge failed"
                );
                job.fail(reason.clone());
                if let Err(e) = self.merge_repo.save(&job).await {
                    tracing::error!(merge_id = %job.id, error = %e, "Failed to save merge failure");
                }
                self.event_publisher.publish_merge_state(
                    job.task_id,
                    job.id,
                    MergeState::Failed,
                    None,
                    Some(&reason),
                );
            }
        }
    }

    /// 保存状态变更；失败时改记为 failed，返回 false
    async fn persist(&self, job: &mut MergeJob) -> bool {
        let Err(e) = self.merge_repo.save(job).await else {
            return true;
        };
        tracing::error!(
            merge_id = %job.id,
            state = ?job.state,
            error = %e,
            "Failed to update merge job"
        );

        let reason = format!("Database error: {}", e);
        job.fail(reason.clone());
        if let Err(e) = self.merge_repo.save(job).await {
            tracing::error!(merge_id = %job.id, error = %e, "Failed to save merge failure");
        }
        self.event_publisher
            .publish_merge_state(job.task_id, job.id, MergeState::Failed, None, Some(&reason));
        false
    }

    /// 按调用方顺序读取片段并拼接，写入合并产物
    ///
    /// 片段在任务互斥区内读取，重新合成不会在读取过程中删除旧音频。
    async fn assemble(&self, job: &MergeJob) -> Result<(String, MergeSummary), String> {
        let segments = {
            let _guard = self.locks.acquire(job.task_id).await;
            self.load_segments(job).await?
        };

        let merger = self.merger.clone();
        let merged = tokio::task::spawn_blocking(move || merger.merge(&segments))
            .await
            .map_err(|e| format!("Merge task panicked: {}", e))?
            .map_err(|e| format!("Merge error: {}", e))?;

        let MergedAudio {
            data,
            duration_ms,
            sample_rate,
            ..
        } = merged;
        let key = merge_key(job.task_id, job.id);
        let metadata = AudioMetadata {
            content_hash: content_hash(&data),
            duration_ms,
            sample_rate: Some(sample_rate),
        };
        self.audio_store
            .put(&key, data, metadata)
            .await
            .map_err(|e| format!("Storage error: {}", e))?;

        Ok((key, MergeSummary { duration_ms, sample_rate }))
    }

    async fn load_segments(&self, job: &MergeJob) -> Result<Vec<Vec<u8>>, String> {
        let task = self
            .task_repo
            .find_by_id(job.task_id)
            .await
            .map_err(|e| format!("Database error: {}", e))?
            .ok_or_else(|| format!("Task {} not found", job.task_id))?;

        let mut segments = Vec::with_capacity(job.sentence_ids.len());
        for sentence_id in &job.sentence_ids {
            let audio = task
                .sentence(*sentence_id)
                .and_then(|s| s.synthesis.audio.as_ref())
                .ok_or_else(|| format!("Sentence {} has no synthesized audio", sentence_id))?;

            let data = self
                .audio_store
                .get(&audio.key)
                .await
                .map_err(|e| format!("Storage error: {}", e))?
                .ok_or_else(|| format!("Audio of sentence {} is missing", sentence_id))?;
            segments.push(data);
        }
        Ok(segments)
    }

    async fn mark_task_merged(&self, job: &MergeJob) {
        let _guard = self.locks.acquire(job.task_id).await;

        let mut task = match self.task_repo.find_by_id(job.task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(task_id = %job.task_id, error = %e, "Failed to load task");
                return;
            }
        };

        if let Err(e) = task.mark_merged() {
            tracing::warn!(task_id = %job.task_id, error = %e, "Task cannot enter merged state");
            return;
        }
        if let Err(e) = self.task_repo.update_status(job.task_id, task.status()).await {
            tracing::error!(task_id = %job.task_id, error = %e, "Failed to update task status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    use crate::application::ports::RepositoryError;
    use crate::domain::task::{AudioRef, SentenceId, SynthesisStatus, Task, TaskId};
    use crate::domain::BreakingStandard;
    use crate::infrastructure::adapters::audio::encode_pcm16;
    use crate::infrastructure::adapters::WavMerger;
    use crate::infrastructure::memory::InMemoryTaskLocks;
    use crate::infrastructure::persistence::sled::SledAudioStore;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteMergeRepository, SqliteTaskRepository,
    };

    /// 保存指定状态时返回数据库错误
    struct FailingMergeRepository {
        inner: SqliteMergeRepository,
        fail_on: MergeState,
    }

    #[async_trait]
    impl MergeRepositoryPort for FailingMergeRepository {
        async fn save(&self, job: &MergeJob) -> Result<(), RepositoryError> {
            if job.state == self.fail_on {
                return Err(RepositoryError::DatabaseError("disk I/O error".into()));
            }
            self.inner.save(job).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<MergeJob>, RepositoryError> {
            self.inner.find_by_id(id).await
        }

        async fn list_by_task(&self, task_id: TaskId) -> Result<Vec<MergeJob>, RepositoryError> {
            self.inner.list_by_task(task_id).await
        }

        async fn find_active_by_task(
            &self,
            task_id: TaskId,
        ) -> Result<Vec<MergeJob>, RepositoryError> {
            self.inner.find_active_by_task(task_id).await
        }

        async fn fail_active(&self, reason: &str) -> Result<usize, RepositoryError> {
            self.inner.fail_active(reason).await
        }
    }

    struct Fixture {
        context: Arc<MergeContext>,
        merge_repo: Arc<FailingMergeRepository>,
        task_repo: Arc<SqliteTaskRepository>,
        audio_store: Arc<dyn AudioStorePort>,
        job: MergeJob,
        _dir: tempfile::TempDir,
    }

    /// 两句均已合成的任务，以及引用它们的排队中合并任务
    async fn fixture(fail_on: MergeState) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let audio_store = SledAudioStore::open(dir.path().join("store.sled"), 0)
            .unwrap()
            .arc();
        let task_repo = Arc::new(SqliteTaskRepository::new(pool.clone()));
        let merge_repo = Arc::new(FailingMergeRepository {
            inner: SqliteMergeRepository::new(pool),
            fail_on,
        });

        let mut task = Task::new(BreakingStandard::Punctuation, None);
        task.begin_segmenting().unwrap();
        task.populate("第一句。第二句。", 10_000).unwrap();
        let ids: Vec<SentenceId> = task.sentences().iter().map(|s| s.id).collect();
        for id in &ids {
            let key = format!("segment:{}:{}", task.id(), id);
            let wav = encode_pcm16(&[0i16; 1600], 16_000, 1);
            let metadata = AudioMetadata {
                content_hash: content_hash(&wav),
                duration_ms: 100,
                sample_rate: Some(16_000),
            };
            audio_store.put(&key, wav, metadata).await.unwrap();

            let sentence = task.sentence_mut(*id).unwrap();
            sentence.synthesis.status = SynthesisStatus::Succeeded;
            sentence.synthesis.audio = Some(AudioRef {
                key,
                duration_ms: 100,
            });
        }
        task_repo.save(&task).await.unwrap();

        let job = MergeJob::new(task.id(), ids);
        merge_repo.inner.save(&job).await.unwrap();

        let context = Arc::new(MergeContext {
            merge_repo: merge_repo.clone(),
            task_repo: task_repo.clone(),
            locks: Arc::new(InMemoryTaskLocks::new()),
            audio_store: audio_store.clone(),
            merger: Arc::new(WavMerger::new()),
            event_publisher: Arc::new(EventPublisher::new()),
        });

        Fixture {
            context,
            merge_repo,
            task_repo,
            audio_store,
            job,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_merge_succeeds() {
        let fx = fixture(MergeState::Failed).await;
        fx.context.process_job(fx.job.clone()).await;

        let saved = fx.merge_repo.find_by_id(fx.job.id).await.unwrap().unwrap();
        assert_eq!(saved.state, MergeState::Succeeded);
        assert_eq!(saved.duration_ms, Some(200));
        let key = saved.audio_key.unwrap();
        assert!(fx.audio_store.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_start_save_failure_marks_job_failed() {
        let fx = fixture(MergeState::Running).await;
        fx.context.process_job(fx.job.clone()).await;

        let saved = fx.merge_repo.find_by_id(fx.job.id).await.unwrap().unwrap();
        assert_eq!(saved.state, MergeState::Failed);
        assert!(saved.error.unwrap().contains("Database error"));
        assert!(!fx
            .audio_store
            .exists(&merge_key(fx.job.task_id, fx.job.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_result_save_failure_marks_job_failed() {
        let fx = fixture(MergeState::Succeeded).await;
        fx.context.process_job(fx.job.clone()).await;

        let saved = fx.merge_repo.find_by_id(fx.job.id).await.unwrap().unwrap();
        assert_eq!(saved.state, MergeState::Failed);
        assert!(fx.merge_repo.find_active_by_task(fx.job.task_id).await.unwrap().is_empty());

        // 未记录的产物被清理
        assert!(!fx
            .audio_store
            .exists(&merge_key(fx.job.task_id, fx.job.id))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_segments_are_read_inside_task_lock() {
        let fx = fixture(MergeState::Failed).await;
        let guard = fx.context.locks.acquire(fx.job.task_id).await;

        let handle = tokio::spawn({
            let context = fx.context.clone();
            let job = fx.job.clone();
            async move { context.process_job(job).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let running = fx.merge_repo.find_by_id(fx.job.id).await.unwrap().unwrap();
        assert_eq!(running.state, MergeState::Running);

        // 持锁期间替换第一句的音频并删除旧片段
        let mut task = fx.task_repo.find_by_id(fx.job.task_id).await.unwrap().unwrap();
        let first = fx.job.sentence_ids[0];
        let new_key = format!("segment:{}:{}:v2", task.id(), first);
        let wav = encode_pcm16(&[0i16; 4800], 16_000, 1);
        let metadata = AudioMetadata {
            content_hash: content_hash(&wav),
            duration_ms: 300,
            sample_rate: Some(16_000),
        };
        fx.audio_store.put(&new_key, wav, metadata).await.unwrap();
        let sentence = task.sentence_mut(first).unwrap();
        let old = sentence.synthesis.audio.replace(AudioRef {
            key: new_key,
            duration_ms: 300,
        });
        fx.task_repo.save(&task).await.unwrap();
        fx.audio_store.remove(&old.unwrap().key).await.unwrap();
        drop(guard);

        handle.await.unwrap();
        let saved = fx.merge_repo.find_by_id(fx.job.id).await.unwrap().unwrap();
        assert_eq!(saved.state, MergeState::Succeeded);
        assert_eq!(saved.duration_ms, Some(400));
    }
}
