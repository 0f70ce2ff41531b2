//! Merge Commands

use crate::domain::task::{SentenceId, TaskId};

/// 按给定顺序合并句子音频
#[derive(Debug, Clone)]
pub struct MergeSentences {
    pub task_id: TaskId,
    pub sentence_ids: Vec<SentenceId>,
}
