//! Merge Queries

use uuid::Uuid;

use crate::domain::task::TaskId;

/// 合并任务状态
#[derive(Debug, Clone)]
pub struct GetMerge {
    pub merge_id: Uuid,
}

/// 任务的全部合并任务
#[derive(Debug, Clone)]
pub struct ListMerges {
    pub task_id: TaskId,
}

/// 合并产物音频
#[derive(Debug, Clone)]
pub struct GetMergeAudio {
    pub merge_id: Uuid,
}
