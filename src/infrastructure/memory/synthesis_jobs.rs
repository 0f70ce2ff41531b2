//! In-Memory Synthesis Job Manager Implementation

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::ports::{
    JobError, JobState, SubmitMode, SubmitOutcome, SynthesisInput, SynthesisJob,
    SynthesisJobManagerPort,
};
use crate::domain::task::{AudioRef, SentenceId, TaskId};

/// 内存合成任务表
pub struct InMemorySynthesisJobManager {
    /// sentence_id -> 当前任务
    jobs: DashMap<SentenceId, SynthesisJob>,
    /// task_id -> 最近一次批量合成的句子
    batches: DashMap<TaskId, Vec<SentenceId>>,
    /// 任务队列发送端
    queue_sender: mpsc::Sender<SynthesisJob>,
}

impl InMemorySynthesisJobManager {
    pub fn new(queue_sender: mpsc::Sender<SynthesisJob>) -> Self {
        Self {
            jobs: DashMap::new(),
            batches: DashMap::new(),
            queue_sender,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn reserve(&self, sentence_id: SentenceId) -> Result<mpsc::Permit<'_, SynthesisJob>, JobError> {
        self.queue_sender.try_reserve().map_err(|e| {
            tracing::warn!(
                sentence_id = %sentence_id,
                error = %e,
                "Failed to reserve synthesis queue slot"
            );
            match e {
                mpsc::error::TrySendError::Full(()) => JobError::QueueFull,
                mpsc::error::TrySendError::Closed(()) => JobError::QueueClosed,
            }
        })
    }

    /// 只更新当前任务
    fn update_current<F>(&self, sentence_id: SentenceId, job_id: Uuid, update: F) -> bool
    where
        F: FnOnce(&mut SynthesisJob),
    {
        match self.jobs.get_mut(&sentence_id) {
            Some(mut job) if job.job_id == job_id => {
                let old_state = job.state;
                update(&mut job);
                job.updated_at = Utc::now();
                tracing::debug!(
                    job_id = %job_id,
                    sentence_id = %sentence_id,
                    old_state = ?old_state,
                    new_state = ?job.state,
                    "Synthesis job state changed"
                );
                true
            }
            _ => false,
        }
    }
}

/// 预留阶段的决定
enum Planned<'a> {
    /// 合并到预留时仍在排队/运行中的任务
    Coalesce(SynthesisJob),
    Create(mpsc::Permit<'a, SynthesisJob>),
}

impl SynthesisJobManagerPort for InMemorySynthesisJobManager {
    fn submit_all(
        &self,
        task_id: TaskId,
        requests: Vec<(SentenceId, SynthesisInput)>,
        mode: SubmitMode,
    ) -> Result<Vec<SubmitOutcome>, JobError> {
        // 预留阶段不修改任务表；任一预留失败时已拿到的 permit 随 Vec 释放
        let mut planned = Vec::with_capacity(requests.len());
        for (sentence_id, input) in requests {
            let active = match mode {
                SubmitMode::Coalesce => self.get(sentence_id).filter(|job| job.state.is_active()),
                SubmitMode::Supersede => None,
            };
            let plan = match active {
                Some(job) => Planned::Coalesce(job),
                None => Planned::Create(self.reserve(sentence_id)?),
            };
            planned.push((sentence_id, input, plan));
        }

        let mut outcomes = Vec::with_capacity(planned.len());
        for (sentence_id, input, plan) in planned {
            let permit = match plan {
                Planned::Coalesce(job) => {
                    // 预留后任务可能已结束，返回最新记录
                    let current = self.get(sentence_id).unwrap_or(job);
                    outcomes.push(SubmitOutcome::Coalesced(current));
                    continue;
                }
                Planned::Create(permit) => permit,
            };

            let outcome = match self.jobs.entry(sentence_id) {
                // 同一批次中重复的句子
                Entry::Occupied(entry)
                    if mode == SubmitMode::Coalesce && entry.get().state.is_active() =>
                {
                    SubmitOutcome::Coalesced(entry.get().clone())
                }
                Entry::Occupied(mut entry) => {
                    let previous = entry.get().job_id;
                    let generation = entry.get().generation + 1;
                    let job = SynthesisJob::new(task_id, sentence_id, generation, input);
                    permit.send(job.clone());
                    entry.insert(job.clone());
                    tracing::debug!(
                        sentence_id = %sentence_id,
                        previous_job = %previous,
                        job_id = %job.job_id,
                        generation = generation,
                        "Synthesis job replaced"
                    );
                    SubmitOutcome::Created(job)
                }
                Entry::Vacant(entry) => {
                    let job = SynthesisJob::new(task_id, sentence_id, 1, input);
                    permit.send(job.clone());
                    entry.insert(job.clone());
                    SubmitOutcome::Created(job)
                }
            };
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    fn get(&self, sentence_id: SentenceId) -> Option<SynthesisJob> {
        self.jobs.get(&sentence_id).map(|job| job.clone())
    }

    fn is_current(&self, sentence_id: SentenceId, job_id: Uuid) -> bool {
        self.jobs
            .get(&sentence_id)
            .map(|job| job.job_id == job_id)
            .unwrap_or(false)
    }

    fn mark_running(&self, sentence_id: SentenceId, job_id: Uuid) -> bool {
        self.update_current(sentence_id, job_id, |job| job.state = JobState::Running)
    }

    fn mark_succeeded(&self, sentence_id: SentenceId, job_id: Uuid, audio: AudioRef) -> bool {
        self.update_current(sentence_id, job_id, |job| {
            job.state = JobState::Succeeded;
            job.audio = Some(audio);
            job.error = None;
        })
    }

    fn mark_failed(&self, sentence_id: SentenceId, job_id: Uuid, error: String) -> bool {
        self.update_current(sentence_id, job_id, |job| {
            job.state = JobState::Failed;
            job.error = Some(error);
        })
    }

    fn record_batch(&self, task_id: TaskId, sentence_ids: Vec<SentenceId>) {
        tracing::debug!(task_id = %task_id, count = sentence_ids.len(), "Batch recorded");
        self.batches.insert(task_id, sentence_ids);
    }

    fn batch(&self, task_id: TaskId) -> Option<Vec<SentenceId>> {
        self.batches.get(&task_id).map(|ids| ids.clone())
    }

    fn has_active(&self, task_id: TaskId) -> bool {
        self.jobs
            .iter()
            .any(|job| job.task_id == task_id && job.state.is_active())
    }

    fn forget_sentence(&self, sentence_id: SentenceId) {
        self.jobs.remove(&sentence_id);
    }

    fn forget_task(&self, task_id: TaskId) {
        self.jobs.retain(|_, job| job.task_id != task_id);
        self.batches.remove(&task_id);
        tracing::debug!(task_id = %task_id, "Task jobs cleaned up");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::VoiceParams;

    fn input(text: &str) -> SynthesisInput {
        SynthesisInput {
            content: text.to_string(),
            voice: VoiceParams::default(),
            pauses: Vec::new(),
        }
    }

    fn submit(
        manager: &InMemorySynthesisJobManager,
        task_id: TaskId,
        sentence_id: SentenceId,
        input: SynthesisInput,
    ) -> Result<SubmitOutcome, JobError> {
        let mut outcomes =
            manager.submit_all(task_id, vec![(sentence_id, input)], SubmitMode::Coalesce)?;
        Ok(outcomes.remove(0))
    }

    fn supersede(
        manager: &InMemorySynthesisJobManager,
        task_id: TaskId,
        sentence_id: SentenceId,
        input: SynthesisInput,
    ) -> Result<SynthesisJob, JobError> {
        let mut outcomes =
            manager.submit_all(task_id, vec![(sentence_id, input)], SubmitMode::Supersede)?;
        Ok(outcomes.remove(0).into_job())
    }

    #[tokio::test]
    async fn test_submit_coalesces_active_job() {
        let (tx, mut rx) = mpsc::channel(10);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();

        let first = submit(&manager, task_id, sentence_id, input("一")).unwrap();
        let second = submit(&manager, task_id, sentence_id, input("一")).unwrap();

        assert!(!first.is_coalesced());
        assert!(second.is_coalesced());
        assert_eq!(first.job().job_id, second.job().job_id);

        // 只入队一次
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_finished_job_allows_new_submission() {
        let (tx, _rx) = mpsc::channel(10);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();

        let first = submit(&manager, task_id, sentence_id, input("一")).unwrap().into_job();
        assert!(manager.mark_running(sentence_id, first.job_id));
        assert!(manager.mark_failed(sentence_id, first.job_id, "timeout".into()));
        assert!(!manager.has_active(task_id));

        let second = submit(&manager, task_id, sentence_id, input("一")).unwrap();
        assert!(!second.is_coalesced());
        assert_eq!(second.job().generation, 2);
    }

    #[tokio::test]
    async fn test_supersede_invalidates_previous_job() {
        let (tx, _rx) = mpsc::channel(10);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();

        let old = submit(&manager, task_id, sentence_id, input("一")).unwrap().into_job();
        manager.mark_running(sentence_id, old.job_id);
        let new = supersede(&manager, task_id, sentence_id, input("一")).unwrap();

        assert_ne!(old.job_id, new.job_id);
        assert!(!manager.is_current(sentence_id, old.job_id));
        assert!(!manager.mark_succeeded(
            sentence_id,
            old.job_id,
            AudioRef {
                key: "stale".into(),
                duration_ms: 1
            }
        ));
        assert_eq!(manager.get(sentence_id).unwrap().state, JobState::Queued);
    }

    #[tokio::test]
    async fn test_full_queue_leaves_no_job() {
        let (tx, _rx) = mpsc::channel(1);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();

        submit(&manager, task_id, SentenceId::new(), input("一")).unwrap();
        let blocked = SentenceId::new();
        let result = submit(&manager, task_id, blocked, input("二"));

        assert!(matches!(result, Err(JobError::QueueFull)));
        assert!(manager.get(blocked).is_none());
    }

    #[tokio::test]
    async fn test_batch_without_capacity_changes_nothing() {
        let (tx, mut rx) = mpsc::channel(2);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();
        let ids = [SentenceId::new(), SentenceId::new(), SentenceId::new()];

        let requests = ids.iter().map(|id| (*id, input("句"))).collect();
        let result = manager.submit_all(task_id, requests, SubmitMode::Coalesce);

        assert!(matches!(result, Err(JobError::QueueFull)));
        assert!(ids.iter().all(|id| manager.get(*id).is_none()));
        assert!(rx.try_recv().is_err());

        // 预留的容量已释放
        let requests = ids[..2].iter().map(|id| (*id, input("句"))).collect();
        let outcomes = manager.submit_all(task_id, requests, SubmitMode::Coalesce).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_active_jobs_need_no_capacity() {
        let (tx, _rx) = mpsc::channel(1);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();

        let first = submit(&manager, task_id, sentence_id, input("一")).unwrap();
        // 队列已满，但同一句子的提交合并到排队中的任务
        let requests = vec![(sentence_id, input("一")), (sentence_id, input("一"))];
        let outcomes = manager.submit_all(task_id, requests, SubmitMode::Coalesce).unwrap();

        assert!(outcomes.iter().all(|o| o.is_coalesced()));
        assert!(outcomes.iter().all(|o| o.job().job_id == first.job().job_id));
    }

    #[tokio::test]
    async fn test_forget_task() {
        let (tx, _rx) = mpsc::channel(10);
        let manager = InMemorySynthesisJobManager::new(tx);
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();

        submit(&manager, task_id, sentence_id, input("一")).unwrap();
        manager.record_batch(task_id, vec![sentence_id]);
        assert!(manager.has_active(task_id));

        manager.forget_task(task_id);
        assert!(!manager.has_active(task_id));
        assert!(manager.batch(task_id).is_none());
    }
}
