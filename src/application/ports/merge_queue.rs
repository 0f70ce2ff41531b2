//! Merge Queue Port - 合并任务队列

use super::{JobError, MergeJob};

pub trait MergeQueuePort: Send + Sync {
    /// 把已持久化的合并任务交给后台 worker
    fn enqueue(&self, job: MergeJob) -> Result<(), JobError>;
}
