//! Synthesis Command Handlers
//!
//! 提交与结果回写都在任务互斥区内；合成服务调用在 worker 中进行，不持有互斥区。

use std::sync::Arc;

use crate::application::commands::handlers::sentence_handlers::lock_task;
use crate::application::commands::{
    BatchSynthesize, ResynthesizeSentence, SynthesizeSentence, VoiceOverride,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    SubmitMode, SynthesisInput, SynthesisJobManagerPort, TaskLockPort, TaskRepositoryPort,
};
use crate::application::queries::handlers::SynthesisView;
use crate::domain::task::{SentenceId, SynthesisStatus, TaskId};

/// 合成提交的公共流程
#[derive(Clone)]
pub struct SynthesisScheduler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    jobs: Arc<dyn SynthesisJobManagerPort>,
    locks: Arc<dyn TaskLockPort>,
    max_text_chars: usize,
}

impl SynthesisScheduler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        jobs: Arc<dyn SynthesisJobManagerPort>,
        locks: Arc<dyn TaskLockPort>,
        max_text_chars: usize,
    ) -> Self {
        Self {
            task_repo,
            jobs,
            locks,
            max_text_chars,
        }
    }

    async fn task_of(&self, sentence_id: SentenceId) -> Result<TaskId, ApplicationError> {
        self.task_repo
            .find_task_id_by_sentence(sentence_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Sentence", *sentence_id.as_uuid()))
    }

    /// 在任务互斥区内写入音色参数并提交任务
    ///
    /// `targets` 为空表示任务的全部句子。
    async fn schedule(
        &self,
        task_id: TaskId,
        targets: &[SentenceId],
        voice: &VoiceOverride,
        mode: SubmitMode,
    ) -> Result<Vec<SynthesisView>, ApplicationError> {
        let (_guard, mut task) =
            lock_task(self.task_repo.as_ref(), self.locks.as_ref(), task_id).await?;

        let targets: Vec<SentenceId> = if targets.is_empty() {
            task.sentences().iter().map(|s| s.id).collect()
        } else {
            targets.to_vec()
        };
        if let Some(missing) = targets.iter().find(|id| task.ordinal_of(**id).is_none()) {
            return Err(ApplicationError::not_found("Sentence", *missing.as_uuid()));
        }

        if !voice.is_empty() {
            let mut draft = task.clone();
            for id in &targets {
                draft.update_settings(*id, voice.to_edit(), self.max_text_chars)?;
            }
            task = draft;
        }

        let requests: Vec<(SentenceId, SynthesisInput)> = targets
            .iter()
            .filter_map(|id| task.sentence(*id).map(|s| (*id, SynthesisInput::from(s))))
            .collect();
        if !requests.is_empty() {
            task.mark_synthesizing()?;
        }

        // 全部入队或全部不入队；失败时任务保持原状
        let outcomes = self
            .jobs
            .submit_all(task_id, requests, mode)
            .map_err(|e| {
                tracing::warn!(task_id = %task_id, error = %e, "Failed to submit synthesis jobs");
                e
            })?;

        let mut views = Vec::with_capacity(outcomes.len());
        for outcome in &outcomes {
            let Some(sentence) = task.sentence_mut(outcome.job().sentence_id) else {
                continue;
            };
            if !outcome.is_coalesced() {
                sentence.synthesis.status = SynthesisStatus::Queued;
                sentence.synthesis.error = None;
            }
            views.push(SynthesisView::from_job(
                outcome.job(),
                sentence,
                outcome.is_coalesced(),
            ));
        }

        if let Err(e) = self.task_repo.save(&task).await {
            tracing::error!(task_id = %task_id, error = %e, "Failed to save scheduled task");
            outcomes
                .iter()
                .filter(|o| !o.is_coalesced())
                .for_each(|o| self.jobs.forget_sentence(o.job().sentence_id));
            return Err(e.into());
        }

        let coalesced = views.iter().filter(|v| v.coalesced).count();
        tracing::info!(
            task_id = %task_id,
            submitted = views.len() - coalesced,
            coalesced = coalesced,
            mode = ?mode,
            "Synthesis scheduled"
        );

        Ok(views)
    }
}

// ============================================================================
// SynthesizeSentence
// ============================================================================

pub struct SynthesizeSentenceHandler {
    scheduler: SynthesisScheduler,
}

impl SynthesizeSentenceHandler {
    pub fn new(scheduler: SynthesisScheduler) -> Self {
        Self { scheduler }
    }

    pub async fn handle(&self, cmd: SynthesizeSentence) -> Result<SynthesisView, ApplicationError> {
        let task_id = self.scheduler.task_of(cmd.sentence_id).await?;
        self.scheduler
            .schedule(task_id, &[cmd.sentence_id], &cmd.voice, SubmitMode::Coalesce)
            .await?
            .pop()
            .ok_or_else(|| ApplicationError::not_found("Sentence", *cmd.sentence_id.as_uuid()))
    }
}

// ============================================================================
// ResynthesizeSentence
// ============================================================================

pub struct ResynthesizeSentenceHandler {
    scheduler: SynthesisScheduler,
}

impl ResynthesizeSentenceHandler {
    pub fn new(scheduler: SynthesisScheduler) -> Self {
        Self { scheduler }
    }

    pub async fn handle(
        &self,
        cmd: ResynthesizeSentence,
    ) -> Result<SynthesisView, ApplicationError> {
        let task_id = self.scheduler.task_of(cmd.sentence_id).await?;
        self.scheduler
            .schedule(task_id, &[cmd.sentence_id], &cmd.voice, SubmitMode::Supersede)
            .await?
            .pop()
            .ok_or_else(|| ApplicationError::not_found("Sentence", *cmd.sentence_id.as_uuid()))
    }
}

// ============================================================================
// BatchSynthesize
// ============================================================================

/// 批量合成结果
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub task_id: TaskId,
    pub jobs: Vec<SynthesisView>,
}

pub struct BatchSynthesizeHandler {
    scheduler: SynthesisScheduler,
    jobs: Arc<dyn SynthesisJobManagerPort>,
}

impl BatchSynthesizeHandler {
    pub fn new(scheduler: SynthesisScheduler, jobs: Arc<dyn SynthesisJobManagerPort>) -> Self {
        Self { scheduler, jobs }
    }

    pub async fn handle(&self, cmd: BatchSynthesize) -> Result<BatchResult, ApplicationError> {
        let views = self
            .scheduler
            .schedule(cmd.task_id, &cmd.sentence_ids, &cmd.voice, SubmitMode::Coalesce)
            .await?;

        self.jobs
            .record_batch(cmd.task_id, views.iter().map(|v| v.sentence_id).collect());

        Ok(BatchResult {
            task_id: cmd.task_id,
            jobs: views,
        })
    }
}
