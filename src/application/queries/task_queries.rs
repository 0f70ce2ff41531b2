//! Task Queries

use crate::application::ports::PageRequest;
use crate::domain::task::{SentenceId, TaskId};

/// 任务详情
#[derive(Debug, Clone)]
pub struct GetTask {
    pub task_id: TaskId,
}

/// 分页列出任务
#[derive(Debug, Clone)]
pub struct ListTasks {
    pub page: PageRequest,
}

/// 分页列出任务的句子
#[derive(Debug, Clone)]
pub struct ListSentences {
    pub task_id: TaskId,
    pub page: PageRequest,
}

/// 单个句子
#[derive(Debug, Clone)]
pub struct GetSentence {
    pub sentence_id: SentenceId,
}

/// 断句标准目录
#[derive(Debug, Clone)]
pub struct ListBreakingStandards;
