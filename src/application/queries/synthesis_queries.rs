//! Synthesis Queries

use crate::domain::task::{SentenceId, TaskId};

/// 句子合成状态
#[derive(Debug, Clone)]
pub struct GetSentenceSynthesis {
    pub sentence_id: SentenceId,
}

/// 任务合成状态与进度
#[derive(Debug, Clone)]
pub struct GetTaskSynthesis {
    pub task_id: TaskId,
}

/// 句子最近一次成功合成的音频
#[derive(Debug, Clone)]
pub struct GetSentenceAudio {
    pub sentence_id: SentenceId,
}
