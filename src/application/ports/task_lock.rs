//! Task Lock Port - 任务级互斥区
//!
//! 同一任务的句子修改、任务提交与合成结果回写串行执行，不同任务互不影响。
//! 互斥区内不得调用合成服务。

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;

use crate::domain::task::TaskId;

/// 持有期间独占该任务
pub type TaskGuard = OwnedMutexGuard<()>;

#[async_trait]
pub trait TaskLockPort: Send + Sync {
    /// 进入任务的互斥区
    async fn acquire(&self, task_id: TaskId) -> TaskGuard;

    /// 任务删除后释放锁记录
    fn forget(&self, task_id: TaskId);
}
