//! In-Memory Task Locks

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::ports::{TaskGuard, TaskLockPort};
use crate::domain::task::TaskId;

/// 每个任务一把 tokio Mutex
#[derive(Default)]
pub struct InMemoryTaskLocks {
    locks: DashMap<TaskId, Arc<Mutex<()>>>,
}

impl InMemoryTaskLocks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskLockPort for InMemoryTaskLocks {
    async fn acquire(&self, task_id: TaskId) -> TaskGuard {
        // 先克隆出 Arc 再等待，避免持有 DashMap 分片锁跨越 await
        let lock = self
            .locks
            .entry(task_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    fn forget(&self, task_id: TaskId) {
        self.locks.remove(&task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_task_is_exclusive() {
        let locks = Arc::new(InMemoryTaskLocks::new());
        let task_id = TaskId::new();

        let guard = locks.acquire(task_id).await;
        let pending = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(task_id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_tasks_do_not_block() {
        let locks = InMemoryTaskLocks::new();
        let _a = locks.acquire(TaskId::new()).await;
        let other = locks.acquire(TaskId::new());
        let b = tokio::time::timeout(Duration::from_millis(100), other).await;
        assert!(b.is_ok());
    }
}
