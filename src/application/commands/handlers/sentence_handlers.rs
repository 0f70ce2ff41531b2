//! Sentence Command Handlers
//!
//! 所有修改都在任务互斥区内完成：加载聚合 → 修改 → 整体保存。

use std::sync::Arc;

use crate::application::commands::{
    DeleteSentence, InsertSentence, RebreakSentence, UpdateSentenceSettings,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    sentence_prefix, AudioStorePort, MergeRepositoryPort, SentenceRecord, SynthesisJobManagerPort,
    TaskGuard, TaskLockPort, TaskRepositoryPort,
};
use crate::domain::task::{InsertDraft, RebreakSpec, SentenceId, Task, TaskId};
use crate::domain::BreakingStandard;

/// 进入句子所属任务的互斥区并加载任务
pub(crate) async fn lock_owning_task(
    task_repo: &dyn TaskRepositoryPort,
    locks: &dyn TaskLockPort,
    sentence_id: SentenceId,
) -> Result<(TaskGuard, Task), ApplicationError> {
    let not_found = || ApplicationError::not_found("Sentence", *sentence_id.as_uuid());

    let task_id = task_repo
        .find_task_id_by_sentence(sentence_id)
        .await?
        .ok_or_else(not_found)?;
    let (guard, task) = lock_task(task_repo, locks, task_id).await?;

    // 等锁期间句子可能已被删除
    if task.ordinal_of(sentence_id).is_none() {
        return Err(not_found());
    }
    Ok((guard, task))
}

/// 进入任务互斥区并加载任务
pub(crate) async fn lock_task(
    task_repo: &dyn TaskRepositoryPort,
    locks: &dyn TaskLockPort,
    task_id: TaskId,
) -> Result<(TaskGuard, Task), ApplicationError> {
    let guard = locks.acquire(task_id).await;
    let task = task_repo
        .find_by_id(task_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Task", *task_id.as_uuid()))?;
    Ok((guard, task))
}

/// 句子被排队/运行中的合成或合并任务引用时不可删除或重新断句
async fn ensure_not_busy(
    jobs: &dyn SynthesisJobManagerPort,
    merge_repo: &dyn MergeRepositoryPort,
    task_id: TaskId,
    sentence_id: SentenceId,
) -> Result<(), ApplicationError> {
    if jobs.is_active(sentence_id) {
        return Err(ApplicationError::conflict(format!(
            "句子 {} 正在排队或合成中",
            sentence_id
        )));
    }

    let merges = merge_repo.find_active_by_task(task_id).await?;
    if let Some(merge) = merges.iter().find(|m| m.references(sentence_id)) {
        return Err(ApplicationError::conflict(format!(
            "句子 {} 正被合并任务 {} 使用",
            sentence_id, merge.id
        )));
    }
    Ok(())
}

/// 清理被移除句子的音频与任务记录
async fn discard_sentence(
    audio_store: &dyn AudioStorePort,
    jobs: &dyn SynthesisJobManagerPort,
    task_id: TaskId,
    sentence_id: SentenceId,
) {
    jobs.forget_sentence(sentence_id);
    if let Err(e) = audio_store
        .remove_prefix(&sentence_prefix(task_id, sentence_id))
        .await
    {
        tracing::warn!(
            task_id = %task_id,
            sentence_id = %sentence_id,
            error = %e,
            "Failed to remove sentence audio"
        );
    }
}

/// 句子修改所需的依赖
#[derive(Clone)]
pub struct SentenceDeps {
    pub task_repo: Arc<dyn TaskRepositoryPort>,
    pub merge_repo: Arc<dyn MergeRepositoryPort>,
    pub audio_store: Arc<dyn AudioStorePort>,
    pub jobs: Arc<dyn SynthesisJobManagerPort>,
    pub locks: Arc<dyn TaskLockPort>,
    pub max_text_chars: usize,
}

// ============================================================================
// DeleteSentence
// ============================================================================

pub struct DeleteSentenceHandler {
    deps: SentenceDeps,
}

impl DeleteSentenceHandler {
    pub fn new(deps: SentenceDeps) -> Self {
        Self { deps }
    }

    pub async fn handle(&self, cmd: DeleteSentence) -> Result<(), ApplicationError> {
        let d = &self.deps;
        let (_guard, mut task) =
            lock_owning_task(d.task_repo.as_ref(), d.locks.as_ref(), cmd.sentence_id).await?;

        ensure_not_busy(d.jobs.as_ref(), d.merge_repo.as_ref(), task.id(), cmd.sentence_id).await?;

        task.delete_sentence(cmd.sentence_id)?;
        d.task_repo.save(&task).await?;
        discard_sentence(d.audio_store.as_ref(), d.jobs.as_ref(), task.id(), cmd.sentence_id).await;

        tracing::info!(
            task_id = %task.id(),
            sentence_id = %cmd.sentence_id,
            remaining = task.sentence_count(),
            "Sentence deleted"
        );
        Ok(())
    }
}

// ============================================================================
// InsertSentence
// ============================================================================

pub struct InsertSentenceHandler {
    deps: SentenceDeps,
}

impl InsertSentenceHandler {
    pub fn new(deps: SentenceDeps) -> Self {
        Self { deps }
    }

    pub async fn handle(&self, cmd: InsertSentence) -> Result<SentenceRecord, ApplicationError> {
        let d = &self.deps;
        let (_guard, mut task) =
            lock_owning_task(d.task_repo.as_ref(), d.locks.as_ref(), cmd.parent_id).await?;

        let id = task.insert_below(
            InsertDraft {
                parent_id: cmd.parent_id,
                content: cmd.content,
                voice_id: cmd.voice_id,
            },
            d.max_text_chars,
        )?;
        d.task_repo.save(&task).await?;

        let record = SentenceRecord::collect(&task, &[id])
            .pop()
            .ok_or_else(|| ApplicationError::internal("inserted sentence missing"))?;

        tracing::info!(
            task_id = %task.id(),
            parent_id = %cmd.parent_id,
            sentence_id = %id,
            ordinal = record.ordinal,
            "Sentence inserted"
        );
        Ok(record)
    }
}

// ============================================================================
// RebreakSentence
// ============================================================================

/// 重新断句结果
#[derive(Debug, Clone)]
pub struct RebreakResult {
    /// 原句是否被替换（结果与原句相同时为 false）
    pub replaced: bool,
    pub children: Vec<SentenceRecord>,
}

pub struct RebreakSentenceHandler {
    deps: SentenceDeps,
}

impl RebreakSentenceHandler {
    pub fn new(deps: SentenceDeps) -> Self {
        Self { deps }
    }

    pub async fn handle(&self, cmd: RebreakSentence) -> Result<RebreakResult, ApplicationError> {
        let d = &self.deps;
        let spec = RebreakSpec {
            standard: BreakingStandard::from_id(cmd.standard_id)?,
            char_count: cmd.char_count,
        };

        let (_guard, mut task) =
            lock_owning_task(d.task_repo.as_ref(), d.locks.as_ref(), cmd.sentence_id).await?;
        ensure_not_busy(d.jobs.as_ref(), d.merge_repo.as_ref(), task.id(), cmd.sentence_id).await?;

        let outcome = task.rebreak(cmd.sentence_id, spec, d.max_text_chars)?;
        let replaced = outcome.replaced.is_some();
        if replaced {
            d.task_repo.save(&task).await?;
            discard_sentence(d.audio_store.as_ref(), d.jobs.as_ref(), task.id(), cmd.sentence_id)
                .await;
        }

        tracing::info!(
            task_id = %task.id(),
            sentence_id = %cmd.sentence_id,
            standard = spec.standard.as_str(),
            children = outcome.children.len(),
            replaced = replaced,
            "Sentence rebroken"
        );

        Ok(RebreakResult {
            replaced,
            children: SentenceRecord::collect(&task, &outcome.children),
        })
    }
}

// ============================================================================
// UpdateSentenceSettings
// ============================================================================

/// 组合设置结果
#[derive(Debug, Clone)]
pub struct SettingsResult {
    /// 目标句子的最新状态；被重新断句替换时为 None
    pub sentence: Option<SentenceRecord>,
    pub inserted: Vec<SentenceRecord>,
    /// 重新断句产生的子句
    pub children: Vec<SentenceRecord>,
}

pub struct UpdateSentenceSettingsHandler {
    deps: SentenceDeps,
}

impl UpdateSentenceSettingsHandler {
    pub fn new(deps: SentenceDeps) -> Self {
        Self { deps }
    }

    pub async fn handle(
        &self,
        cmd: UpdateSentenceSettings,
    ) -> Result<SettingsResult, ApplicationError> {
        let d = &self.deps;
        let target = cmd.sentence_id;
        let (_guard, mut task) =
            lock_owning_task(d.task_repo.as_ref(), d.locks.as_ref(), target).await?;

        if cmd.change.rebreak.is_some() {
            ensure_not_busy(d.jobs.as_ref(), d.merge_repo.as_ref(), task.id(), target).await?;
        }

        let outcome = task.apply_settings(target, cmd.change, d.max_text_chars)?;
        d.task_repo.save(&task).await?;

        let replaced = outcome
            .rebreak
            .as_ref()
            .map(|r| r.replaced.is_some())
            .unwrap_or(false);
        if replaced {
            discard_sentence(d.audio_store.as_ref(), d.jobs.as_ref(), task.id(), target).await;
        }

        let children = outcome
            .rebreak
            .as_ref()
            .map(|r| SentenceRecord::collect(&task, &r.children))
            .unwrap_or_default();

        tracing::info!(
            task_id = %task.id(),
            sentence_id = %target,
            inserted = outcome.inserted.len(),
            rebroken = replaced,
            "Sentence settings updated"
        );

        Ok(SettingsResult {
            sentence: SentenceRecord::collect(&task, &[target]).pop(),
            inserted: SentenceRecord::collect(&task, &outcome.inserted),
            children,
        })
    }
}
