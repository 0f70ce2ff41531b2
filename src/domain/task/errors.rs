//! Task Context - Errors

use thiserror::Error;

use super::{SentenceId, TaskStatus};
use crate::domain::text_segmenter::SegmentError;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("句子不存在: {0}")]
    SentenceNotFound(SentenceId),

    #[error("无效的文本内容: {0}")]
    InvalidContent(String),

    #[error("无效的音色参数: {0}")]
    InvalidVoiceParams(String),

    #[error("无效的停顿设置: {0}")]
    InvalidPause(String),

    #[error("无效的任务状态转换: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    #[error("任务当前状态不允许修改句子: {0}")]
    NotEditable(TaskStatus),

    #[error("重新断句目标已不存在: {0}")]
    StaleRebreakTarget(SentenceId),

    #[error("同一请求中不能既在句子下方插入又对其重新断句: {0}")]
    OverlappingTargets(SentenceId),

    #[error("断句失败: {0}")]
    Segment(#[from] SegmentError),
}
