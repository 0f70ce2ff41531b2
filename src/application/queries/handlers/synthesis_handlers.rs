//! Synthesis Query Handlers
//!
//! 只读快照，不阻塞也不等待合成完成

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{
    progress_percent, AudioStorePort, SynthesisJob, SynthesisJobManagerPort, TaskRepositoryPort,
};
use crate::application::queries::{GetSentenceAudio, GetSentenceSynthesis, GetTaskSynthesis};
use crate::domain::task::{AudioRef, Sentence, SentenceId, SynthesisStatus, TaskId};

// ============================================================================
// Response DTOs
// ============================================================================

/// 句子合成状态
#[derive(Debug, Clone)]
pub struct SynthesisView {
    pub sentence_id: SentenceId,
    pub task_id: TaskId,
    pub job_id: Option<Uuid>,
    pub generation: u64,
    pub status: SynthesisStatus,
    /// 当前可用的片段；重新合成成功前仍指向上一次成功的片段
    pub audio: Option<AudioRef>,
    pub error: Option<String>,
    /// 是否合并到了已有任务
    pub coalesced: bool,
}

impl SynthesisView {
    pub fn from_job(job: &SynthesisJob, sentence: &Sentence, coalesced: bool) -> Self {
        Self {
            sentence_id: job.sentence_id,
            task_id: job.task_id,
            job_id: Some(job.job_id),
            generation: job.generation,
            status: job.state.into(),
            audio: job.audio.clone().or_else(|| sentence.synthesis.audio.clone()),
            error: job.error.clone(),
            coalesced,
        }
    }

    /// 任务表中没有记录时（如重启后）使用句子上持久化的结果
    pub fn from_sentence(sentence: &Sentence) -> Self {
        Self {
            sentence_id: sentence.id,
            task_id: sentence.task_id,
            job_id: None,
            generation: 0,
            status: sentence.synthesis.status,
            audio: sentence.synthesis.audio.clone(),
            error: sentence.synthesis.error.clone(),
            coalesced: false,
        }
    }

    fn resolve(jobs: &dyn SynthesisJobManagerPort, sentence: &Sentence) -> Self {
        match jobs.get(sentence.id) {
            Some(job) => Self::from_job(&job, sentence, false),
            None => Self::from_sentence(sentence),
        }
    }
}

/// 任务级合成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
}

impl BatchStatus {
    /// 任一失败即失败；全部成功才成功；有排队/运行中即运行中
    pub fn summarize(statuses: &[SynthesisStatus]) -> Self {
        if statuses.iter().any(|s| *s == SynthesisStatus::Failed) {
            BatchStatus::Failed
        } else if !statuses.is_empty()
            && statuses.iter().all(|s| *s == SynthesisStatus::Succeeded)
        {
            BatchStatus::Succeeded
        } else if statuses.iter().any(|s| s.is_active()) {
            BatchStatus::Running
        } else {
            BatchStatus::NotStarted
        }
    }
}

/// 任务合成进度
#[derive(Debug, Clone)]
pub struct TaskSynthesisView {
    pub task_id: TaskId,
    pub status: BatchStatus,
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_started: usize,
    /// floor(succeeded * 100 / total)
    pub progress: u8,
    pub sentences: Vec<SynthesisView>,
}

impl TaskSynthesisView {
    fn build(task_id: TaskId, sentences: Vec<SynthesisView>) -> Self {
        let statuses: Vec<SynthesisStatus> = sentences.iter().map(|v| v.status).collect();
        let count = |status: SynthesisStatus| statuses.iter().filter(|s| **s == status).count();
        let succeeded = count(SynthesisStatus::Succeeded);

        Self {
            task_id,
            status: BatchStatus::summarize(&statuses),
            total: statuses.len(),
            queued: count(SynthesisStatus::Queued),
            running: count(SynthesisStatus::Running),
            succeeded,
            failed: count(SynthesisStatus::Failed),
            not_started: count(SynthesisStatus::NotSynthesized),
            progress: progress_percent(succeeded, statuses.len()),
            sentences,
        }
    }
}

/// 音频数据
#[derive(Debug, Clone)]
pub struct AudioBlob {
    pub data: Vec<u8>,
    pub duration_ms: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetSentenceSynthesis Handler
pub struct GetSentenceSynthesisHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    jobs: Arc<dyn SynthesisJobManagerPort>,
}

impl GetSentenceSynthesisHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        jobs: Arc<dyn SynthesisJobManagerPort>,
    ) -> Self {
        Self { task_repo, jobs }
    }

    pub async fn handle(
        &self,
        query: GetSentenceSynthesis,
    ) -> Result<SynthesisView, ApplicationError> {
        let record = self
            .task_repo
            .find_sentence(query.sentence_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Sentence", *query.sentence_id.as_uuid()))?;
        Ok(SynthesisView::resolve(self.jobs.as_ref(), &record.sentence))
    }
}

/// GetTaskSynthesis Handler
///
/// 统计最近一次批量合成请求的句子；没有批量记录时统计全部句子
pub struct GetTaskSynthesisHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    jobs: Arc<dyn SynthesisJobManagerPort>,
}

impl GetTaskSynthesisHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        jobs: Arc<dyn SynthesisJobManagerPort>,
    ) -> Self {
        Self { task_repo, jobs }
    }

    pub async fn handle(
        &self,
        query: GetTaskSynthesis,
    ) -> Result<TaskSynthesisView, ApplicationError> {
        let task = self
            .task_repo
            .find_by_id(query.task_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Task", *query.task_id.as_uuid()))?;

        let views: Vec<SynthesisView> = match self.jobs.batch(query.task_id) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| task.sentence(*id))
                .map(|s| SynthesisView::resolve(self.jobs.as_ref(), s))
                .collect(),
            None => task
                .sentences()
                .iter()
                .map(|s| SynthesisView::resolve(self.jobs.as_ref(), s))
                .collect(),
        };

        Ok(TaskSynthesisView::build(query.task_id, views))
    }
}

/// GetSentenceAudio Handler
pub struct GetSentenceAudioHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    audio_store: Arc<dyn AudioStorePort>,
}

impl GetSentenceAudioHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        audio_store: Arc<dyn AudioStorePort>,
    ) -> Self {
        Self {
            task_repo,
            audio_store,
        }
    }

    pub async fn handle(&self, query: GetSentenceAudio) -> Result<AudioBlob, ApplicationError> {
        let sentence_uuid = *query.sentence_id.as_uuid();
        let not_found = || ApplicationError::not_found("SentenceAudio", sentence_uuid);

        let record = self
            .task_repo
            .find_sentence(query.sentence_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Sentence", *query.sentence_id.as_uuid()))?;
        let audio = record.sentence.synthesis.audio.ok_or_else(not_found)?;

        let data = self.audio_store.get(&audio.key).await?.ok_or_else(not_found)?;
        Ok(AudioBlob {
            data,
            duration_ms: audio.duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::SynthesisStatus::*;

    #[test]
    fn test_batch_status_rules() {
        assert_eq!(BatchStatus::summarize(&[]), BatchStatus::NotStarted);
        assert_eq!(BatchStatus::summarize(&[NotSynthesized]), BatchStatus::NotStarted);
        assert_eq!(BatchStatus::summarize(&[Succeeded, Queued]), BatchStatus::Running);
        assert_eq!(BatchStatus::summarize(&[Succeeded, Succeeded]), BatchStatus::Succeeded);
        assert_eq!(BatchStatus::summarize(&[Running, Failed]), BatchStatus::Failed);
    }

    #[test]
    fn test_progress_counts() {
        let task_id = TaskId::new();
        let view = |status| SynthesisView {
            sentence_id: SentenceId::new(),
            task_id,
            job_id: None,
            generation: 0,
            status,
            audio: None,
            error: None,
            coalesced: false,
        };

        let summary = TaskSynthesisView::build(
            task_id,
            vec![view(Succeeded), view(Running), view(Queued)],
        );
        assert_eq!(summary.progress, 33);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.queued, 1);
        assert_eq!(summary.status, BatchStatus::Running);
    }
}
