//! Task Command Handlers

use std::sync::Arc;

use crate::application::commands::{CreateTask, DeleteTask};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    task_prefixes, AudioStorePort, MergeRepositoryPort, SynthesisJobManagerPort, TaskLockPort,
    TaskRepositoryPort, TaskSummary,
};
use crate::domain::task::Task;
use crate::domain::BreakingStandard;

/// 创建任务时的默认断句参数
#[derive(Debug, Clone, Copy)]
pub struct TaskDefaults {
    pub standard: BreakingStandard,
    pub char_count: usize,
    pub max_text_chars: usize,
}

// ============================================================================
// CreateTask
// ============================================================================

/// CreateTask Handler - 创建任务并同步完成断句
pub struct CreateTaskHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    defaults: TaskDefaults,
}

impl CreateTaskHandler {
    pub fn new(task_repo: Arc<dyn TaskRepositoryPort>, defaults: TaskDefaults) -> Self {
        Self { task_repo, defaults }
    }

    pub async fn handle(&self, cmd: CreateTask) -> Result<TaskSummary, ApplicationError> {
        let standard = match cmd.standard_id {
            Some(id) => BreakingStandard::from_id(id)?,
            None => self.defaults.standard,
        };
        let char_count = if standard.requires_char_count() {
            Some(cmd.char_count.unwrap_or(self.defaults.char_count))
        } else {
            None
        };

        let mut task = Task::new(standard, char_count);
        task.begin_segmenting()?;
        let count = task.populate(&cmd.content, self.defaults.max_text_chars)?;

        self.task_repo.save(&task).await?;

        tracing::info!(
            task_id = %task.id(),
            standard = standard.as_str(),
            sentences = count,
            "Task created"
        );

        Ok(TaskSummary::from_task(&task))
    }
}

// ============================================================================
// DeleteTask
// ============================================================================

/// DeleteTask Handler - 级联删除
pub struct DeleteTaskHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    merge_repo: Arc<dyn MergeRepositoryPort>,
    audio_store: Arc<dyn AudioStorePort>,
    jobs: Arc<dyn SynthesisJobManagerPort>,
    locks: Arc<dyn TaskLockPort>,
}

impl DeleteTaskHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        merge_repo: Arc<dyn MergeRepositoryPort>,
        audio_store: Arc<dyn AudioStorePort>,
        jobs: Arc<dyn SynthesisJobManagerPort>,
        locks: Arc<dyn TaskLockPort>,
    ) -> Self {
        Self {
            task_repo,
            merge_repo,
            audio_store,
            jobs,
            locks,
        }
    }

    pub async fn handle(&self, cmd: DeleteTask) -> Result<(), ApplicationError> {
        let task_id = cmd.task_id;
        let guard = self.locks.acquire(task_id).await;

        if self.task_repo.find_summary(task_id).await?.is_none() {
            return Err(ApplicationError::not_found("Task", *task_id.as_uuid()));
        }

        if self.jobs.has_active(task_id) {
            return Err(ApplicationError::conflict("任务存在排队或合成中的句子，无法删除"));
        }
        if !self.merge_repo.find_active_by_task(task_id).await?.is_empty() {
            return Err(ApplicationError::conflict("任务存在进行中的合并，无法删除"));
        }

        // 句子、任务级规则、规则设置与合并记录在同一事务内删除
        self.task_repo.delete(task_id).await?;

        let mut removed_audio = 0;
        for prefix in task_prefixes(task_id) {
            match self.audio_store.remove_prefix(&prefix).await {
                Ok(n) => removed_audio += n,
                Err(e) => {
                    tracing::warn!(
                        task_id = %task_id,
                        prefix = %prefix,
                        error = %e,
                        "Failed to remove task audio"
                    );
                }
            }
        }

        self.jobs.forget_task(task_id);
        drop(guard);
        self.locks.forget(task_id);

        tracing::info!(
            task_id = %task_id,
            audio = removed_audio,
            "Task deleted"
        );

        Ok(())
    }
}
