//! Merge Command Handlers

use std::sync::Arc;

use crate::application::commands::handlers::sentence_handlers::lock_task;
use crate::application::commands::MergeSentences;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    MergeJob, MergeQueuePort, MergeRepositoryPort, TaskLockPort, TaskRepositoryPort,
};

/// MergeSentences Handler - 校验前置条件后创建合并任务并入队
pub struct MergeSentencesHandler {
    task_repo: Arc<dyn TaskRepositoryPort>,
    merge_repo: Arc<dyn MergeRepositoryPort>,
    merge_queue: Arc<dyn MergeQueuePort>,
    locks: Arc<dyn TaskLockPort>,
}

impl MergeSentencesHandler {
    pub fn new(
        task_repo: Arc<dyn TaskRepositoryPort>,
        merge_repo: Arc<dyn MergeRepositoryPort>,
        merge_queue: Arc<dyn MergeQueuePort>,
        locks: Arc<dyn TaskLockPort>,
    ) -> Self {
        Self {
            task_repo,
            merge_repo,
            merge_queue,
            locks,
        }
    }

    pub async fn handle(&self, cmd: MergeSentences) -> Result<MergeJob, ApplicationError> {
        if cmd.sentence_ids.is_empty() {
            return Err(ApplicationError::validation("sentence_ids 不能为空"));
        }

        let (_guard, task) =
            lock_task(self.task_repo.as_ref(), self.locks.as_ref(), cmd.task_id).await?;

        for id in &cmd.sentence_ids {
            let sentence = task
                .sentence(*id)
                .ok_or_else(|| ApplicationError::not_found("Sentence", *id.as_uuid()))?;
            if !sentence.has_segment() {
                return Err(ApplicationError::conflict(format!(
                    "句子 {} 尚未合成成功，无法合并",
                    id
                )));
            }
        }

        let mut job = MergeJob::new(cmd.task_id, cmd.sentence_ids);
        self.merge_repo.save(&job).await?;

        if let Err(e) = self.merge_queue.enqueue(job.clone()) {
            job.fail(e.to_string());
            self.merge_repo.save(&job).await?;
            return Err(e.into());
        }

        tracing::info!(
            task_id = %cmd.task_id,
            merge_id = %job.id,
            sentences = job.sentence_ids.len(),
            "Merge job queued"
        );

        Ok(job)
    }
}
