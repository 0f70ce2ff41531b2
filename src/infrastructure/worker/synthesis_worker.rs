//! Synthesis Worker - Background TTS Job Processor
//!
//! 合成服务调用不持有任务互斥区；结果回写前再次确认任务仍是当前任务。

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Semaphore};

use crate::application::ports::{
    content_hash, segment_key, AudioMetadata, AudioStorePort, InferRequest, InferResponse,
    SynthesisJob, SynthesisJobManagerPort, TaskLockPort, TaskRepositoryPort, TtsEnginePort,
    TtsError,
};
use crate::domain::task::{AudioRef, SentenceId, SentenceSynthesis, SynthesisStatus};
use crate::infrastructure::events::EventPublisher;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct SynthesisWorkerConfig {
    /// 最大并发合成数
    pub max_concurrent: usize,
    /// 单次合成服务调用的超时
    pub provider_timeout: Duration,
}

impl Default for SynthesisWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            provider_timeout: Duration::from_secs(60),
        }
    }
}

/// 处理任务所需的共享依赖
struct SynthesisContext {
    provider_timeout: Duration,
    jobs: Arc<dyn SynthesisJobManagerPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    locks: Arc<dyn TaskLockPort>,
    tts_engine: Arc<dyn TtsEnginePort>,
    audio_store: Arc<dyn AudioStorePort>,
    event_publisher: Arc<EventPublisher>,
    /// sentence_id -> 合成服务调用槽，同一句子同时最多一个调用
    provider_slots: DashMap<SentenceId, Arc<Mutex<()>>>,
}

/// 合成 Worker
///
/// 从队列消费合成任务并调用合成服务
pub struct SynthesisWorker {
    max_concurrent: usize,
    queue_receiver: mpsc::Receiver<SynthesisJob>,
    context: Arc<SynthesisContext>,
}

impl SynthesisWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SynthesisWorkerConfig,
        queue_receiver: mpsc::Receiver<SynthesisJob>,
        jobs: Arc<dyn SynthesisJobManagerPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        locks: Arc<dyn TaskLockPort>,
        tts_engine: Arc<dyn TtsEnginePort>,
        audio_store: Arc<dyn AudioStorePort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            max_concurrent: config.max_concurrent.max(1),
            queue_receiver,
            context: Arc::new(SynthesisContext {
                provider_timeout: config.provider_timeout,
                jobs,
                task_repo,
                locks,
                tts_engine,
                audio_store,
                event_publisher,
                provider_slots: DashMap::new(),
            }),
        }
    }

    /// 启动 Worker，队列关闭后返回
    pub async fn run(mut self) {
        tracing::info!(max_concurrent = self.max_concurrent, "SynthesisWorker started");

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

        tracing::info!("SynthesisWorker stopped");
    }
}

impl SynthesisContext {
    fn slot(&self, sentence_id: SentenceId) -> Arc<Mutex<()>> {
        self.provider_slots
            .entry(sentence_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 没有其他任务等待时移除调用槽
    fn release_slot(&self, sentence_id: SentenceId) {
        self.provider_slots
            .remove_if(&sentence_id, |_, slot| Arc::strong_count(slot) == 1);
    }

    async fn process_job(&self, job: SynthesisJob) {
        // 已被取代的排队任务不会调用合成服务
        if !self.jobs.is_current(job.sentence_id, job.job_id) {
            tracing::debug!(
                job_id = %job.job_id,
                sentence_id = %job.sentence_id,
                "Job superseded, skipping"
            );
            return;
        }

        let slot = self.slot(job.sentence_id);
        {
            let _slot = slot.lock().await;
            self.run_job(&job).await;
        }
        drop(slot);
        self.release_slot(job.sentence_id);
    }

    async fn run_job(&self, job: &SynthesisJob) {
        // 等待调用槽期间可能被取代
        if !self.jobs.is_current(job.sentence_id, job.job_id) {
            tracing::debug!(
                job_id = %job.job_id,
                sentence_id = %job.sentence_id,
                "Job superseded while waiting, skipping"
            );
            return;
        }

        if !self.commit_running(job).await {
            return;
        }

        let request = InferRequest::new(&job.input.content, &job.input.voice, &job.input.pauses);
        let inference = tokio::time::timeout(self.provider_timeout, self.tts_engine.infer(request));
        let result = match inference.await {
            Ok(result) => result,
            Err(_) => Err(TtsError::Timeout),
        };

        match result {
            Ok(response) => self.commit_success(job, response).await,
            Err(e) => {
                tracing::error!(
                    job_id = %job.job_id,
                    sentence_id = %job.sentence_id,
                    error = %e,
                    "TTS synthesis failed"
                );
                self.commit_failure(job, format!("TTS error: {}", e)).await;
            }
        }
    }

    /// 在任务互斥区内读取句子当前的合成结果，修改后回写
    async fn write_synthesis<F>(&self, job: &SynthesisJob, update: F) -> Result<bool, String>
    where
        F: FnOnce(&mut SentenceSynthesis),
    {
        let record = self
            .task_repo
            .find_sentence(job.sentence_id)
            .await
            .map_err(|e| e.to_string())?;
        let Some(record) = record else {
            return Ok(false);
        };

        let mut synthesis = record.sentence.synthesis;
        update(&mut synthesis);
        self.task_repo
            .save_synthesis(job.sentence_id, &synthesis)
            .await
            .map_err(|e| e.to_string())
    }

    /// queued → running
    async fn commit_running(&self, job: &SynthesisJob) -> bool {
        let _guard = self.locks.acquire(job.task_id).await;

        if !self.jobs.mark_running(job.sentence_id, job.job_id) {
            return false;
        }

        match self
            .write_synthesis(job, |s| {
                s.status = SynthesisStatus::Running;
                s.error = None;
            })
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    job_id = %job.job_id,
                    sentence_id = %job.sentence_id,
                    "Sentence removed, skipping"
                );
                self.jobs.mark_failed(job.sentence_id, job.job_id, "Sentence removed".to_string());
                return false;
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job.job_id,
                    sentence_id = %job.sentence_id,
                    error = %e,
                    "Failed to persist running state"
                );
                self.jobs
                    .mark_failed(job.sentence_id, job.job_id, format!("Database error: {}", e));
                self.event_publisher.publish_synthesis_failed(
                    job.task_id,
                    job.sentence_id,
                    job.job_id,
                    job.generation,
                    &format!("Database error: {}", e),
                );
                return false;
            }
        }

        self.event_publisher
            .publish_synthesis_running(job.task_id, job.sentence_id, job.job_id, job.generation);
        true
    }

    /// 失败时保留上一次成功的片段
    async fn commit_failure(&self, job: &SynthesisJob, reason: String) {
        let _guard = self.locks.acquire(job.task_id).await;

        if !self.jobs.mark_failed(job.sentence_id, job.job_id, reason.clone()) {
            tracing::debug!(job_id = %job.job_id, "Superseded job failed, result discarded");
            return;
        }

        let persisted = self
            .write_synthesis(job, |s| {
                s.status = SynthesisStatus::Failed;
                s.error = Some(reason.clone());
            })
            .await;
        if let Err(e) = persisted {
            tracing::error!(
                job_id = %job.job_id,
                sentence_id = %job.sentence_id,
                error = %e,
                "Failed to persist failure"
            );
        }

        self.event_publisher.publish_synthesis_failed(
            job.task_id,
            job.sentence_id,
            job.job_id,
            job.generation,
            &reason,
        );
    }

    async fn commit_success(&self, job: &SynthesisJob, response: InferResponse) {
        let key = segment_key(job.task_id, job.sentence_id, job.job_id);
        let duration_ms = response.duration_ms.unwrap_or(0);
        let metadata = AudioMetadata {
            content_hash: content_hash(&response.audio_data),
            duration_ms,
            sample_rate: response.sample_rate,
        };

        if let Err(e) = self.audio_store.put(&key, response.audio_data, metadata).await {
            tracing::error!(
                job_id = %job.job_id,
                sentence_id = %job.sentence_id,
                error = %e,
                "Failed to store audio"
            );
            self.commit_failure(job, format!("Storage error: {}", e)).await;
            return;
        }

        let guard = self.locks.acquire(job.task_id).await;

        // 运行中被取代的任务结果丢弃
        if !self.jobs.is_current(job.sentence_id, job.job_id) {
            drop(guard);
            tracing::debug!(
                job_id = %job.job_id,
                sentence_id = %job.sentence_id,
                "Job superseded, discarding result"
            );
            self.discard_audio(&key).await;
            return;
        }

        let audio = AudioRef {
            key: key.clone(),
            duration_ms,
        };
        let mut previous = None;
        let persisted = self
            .write_synthesis(job, |s| {
                previous = s.audio.take();
                s.status = SynthesisStatus::Succeeded;
                s.audio = Some(audio.clone());
                s.error = None;
            })
            .await;

        match persisted {
            Ok(true) => {
                self.jobs.mark_succeeded(job.sentence_id, job.job_id, audio);
                drop(guard);

                if let Some(previous) = previous.filter(|p| p.key != key) {
                    self.discard_audio(&previous.key).await;
                }
                self.event_publisher.publish_synthesis_succeeded(
                    job.task_id,
                    job.sentence_id,
                    job.job_id,
                    job.generation,
                    duration_ms,
                );
                tracing::info!(
                    job_id = %job.job_id,
                    task_id = %job.task_id,
                    sentence_id = %job.sentence_id,
                    generation = job.generation,
                    duration_ms = duration_ms,
                    "Synthesis completed"
                );
            }
            Ok(false) => {
                self.jobs
                    .mark_failed(job.sentence_id, job.job_id, "Sentence removed".to_string());
                drop(guard);
                tracing::debug!(
                    job_id = %job.job_id,
                    sentence_id = %job.sentence_id,
                    "Sentence removed, discarding result"
                );
                self.discard_audio(&key).await;
            }
            Err(e) => {
                let reason = format!("Database error: {}", e);
                self.jobs.mark_failed(job.sentence_id, job.job_id, reason.clone());
                drop(guard);
                tracing::error!(
                    job_id = %job.job_id,
                    sentence_id = %job.sentence_id,
                    error = %e,
                    "Failed to persist synthesis result"
                );
                self.discard_audio(&key).await;
                self.event_publisher.publish_synthesis_failed(
                    job.task_id,
                    job.sentence_id,
                    job.job_id,
                    job.generation,
                    &reason,
                );
            }
        }
    }

    async fn discard_audio(&self, key: &str) {
        if let Err(e) = self.audio_store.remove(key).await {
            tracing::warn!(key = %key, error = %e, "Failed to remove audio");
        }
    }
}
