//! Synthesis Job Manager Port - 句子合成任务管理
//!
//! 定义合成任务表的抽象接口，具体实现在 infrastructure/memory 层。
//! 每个句子只有一个「当前」任务，新一代任务会取代旧任务。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::task::{
    AudioRef, Pause, Sentence, SentenceId, SynthesisStatus, TaskId, VoiceParams,
};

/// Job Manager 错误
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Job queue is full")]
    QueueFull,

    #[error("Job queue is closed")]
    QueueClosed,
}

/// 合成任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Succeeded => "succeeded",
            JobState::Failed => "failed",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, JobState::Queued | JobState::Running)
    }
}

impl From<JobState> for SynthesisStatus {
    fn from(state: JobState) -> Self {
        match state {
            JobState::Queued => SynthesisStatus::Queued,
            JobState::Running => SynthesisStatus::Running,
            JobState::Succeeded => SynthesisStatus::Succeeded,
            JobState::Failed => SynthesisStatus::Failed,
        }
    }
}

/// 提交时的句子快照（合成使用快照，不受之后的编辑影响）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisInput {
    pub content: String,
    pub voice: VoiceParams,
    pub pauses: Vec<Pause>,
}

impl From<&Sentence> for SynthesisInput {
    fn from(sentence: &Sentence) -> Self {
        Self {
            content: sentence.content.clone(),
            voice: sentence.voice.clone(),
            pauses: sentence.pauses.clone(),
        }
    }
}

/// 合成任务
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub job_id: Uuid,
    pub task_id: TaskId,
    pub sentence_id: SentenceId,
    /// 同一句子的第几代任务，从 1 开始
    pub generation: u64,
    pub state: JobState,
    pub input: SynthesisInput,
    pub audio: Option<AudioRef>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SynthesisJob {
    pub fn new(
        task_id: TaskId,
        sentence_id: SentenceId,
        generation: u64,
        input: SynthesisInput,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            task_id,
            sentence_id,
            generation,
            state: JobState::Queued,
            input,
            audio: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// 提交结果
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// 新建任务并已入队
    Created(SynthesisJob),
    /// 已有排队或运行中的任务，直接返回
    Coalesced(SynthesisJob),
}

impl SubmitOutcome {
    pub fn job(&self) -> &SynthesisJob {
        match self {
            SubmitOutcome::Created(job) | SubmitOutcome::Coalesced(job) => job,
        }
    }

    pub fn into_job(self) -> SynthesisJob {
        match self {
            SubmitOutcome::Created(job) | SubmitOutcome::Coalesced(job) => job,
        }
    }

    pub fn is_coalesced(&self) -> bool {
        matches!(self, SubmitOutcome::Coalesced(_))
    }
}

/// 提交方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// 已有排队/运行中的任务时合并到该任务
    Coalesce,
    /// 总是创建新一代任务，取代当前任务
    Supersede,
}

/// Synthesis Job Manager Port
///
/// 所有状态保存在内存中；按句子 ID 的修改是原子的。
/// `mark_*` 只对当前任务生效，被取代的任务返回 false。
/// `submit_all` 与 `forget_*` 由调用方在任务互斥区内调用。
pub trait SynthesisJobManagerPort: Send + Sync {
    /// 提交一组句子
    ///
    /// 先为所有需要新建的任务预留队列容量，任一预留失败则不修改任务表也不入队。
    fn submit_all(
        &self,
        task_id: TaskId,
        requests: Vec<(SentenceId, SynthesisInput)>,
        mode: SubmitMode,
    ) -> Result<Vec<SubmitOutcome>, JobError>;

    /// 句子的当前任务
    fn get(&self, sentence_id: SentenceId) -> Option<SynthesisJob>;

    fn is_current(&self, sentence_id: SentenceId, job_id: Uuid) -> bool;

    fn mark_running(&self, sentence_id: SentenceId, job_id: Uuid) -> bool;

    fn mark_succeeded(&self, sentence_id: SentenceId, job_id: Uuid, audio: AudioRef) -> bool;

    fn mark_failed(&self, sentence_id: SentenceId, job_id: Uuid, error: String) -> bool;

    /// 记录任务最近一次批量合成的句子集合
    fn record_batch(&self, task_id: TaskId, sentence_ids: Vec<SentenceId>);

    fn batch(&self, task_id: TaskId) -> Option<Vec<SentenceId>>;

    /// 句子是否有排队/运行中的任务
    fn is_active(&self, sentence_id: SentenceId) -> bool {
        self.get(sentence_id)
            .map(|job| job.state.is_active())
            .unwrap_or(false)
    }

    /// 任务下是否有排队/运行中的任务
    fn has_active(&self, task_id: TaskId) -> bool;

    /// 清理句子的任务记录
    fn forget_sentence(&self, sentence_id: SentenceId);

    /// 清理任务的全部记录
    fn forget_task(&self, task_id: TaskId);
}
