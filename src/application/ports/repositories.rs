//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::reading_rule::{ReadingRule, RuleId, RuleSetting};
use crate::domain::task::{
    Sentence, SentenceId, SentenceSynthesis, SynthesisStatus, Task, TaskId, TaskStatus,
};
use crate::domain::BreakingStandard;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Paging
// ============================================================================

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

/// 分页参数（page 从 1 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<usize>, page_size: Option<usize>) -> Self {
        Self {
            page: page.unwrap_or(1),
            page_size: page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1) * self.page_size
    }
}

/// 分页结果
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

// ============================================================================
// Task Repository
// ============================================================================

/// 任务概要（列表与详情使用，不加载句子）
#[derive(Debug, Clone)]
pub struct TaskSummary {
    pub id: TaskId,
    pub status: TaskStatus,
    pub standard: BreakingStandard,
    pub char_count: Option<usize>,
    pub sentence_count: usize,
    pub succeeded_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskSummary {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id(),
            status: task.status(),
            standard: task.standard(),
            char_count: task.char_count(),
            sentence_count: task.sentence_count(),
            succeeded_count: task
                .sentences()
                .iter()
                .filter(|s| s.synthesis.status == SynthesisStatus::Succeeded)
                .count(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }

    /// 合成进度百分比（向下取整）
    pub fn progress(&self) -> u8 {
        progress_percent(self.succeeded_count, self.sentence_count)
    }
}

pub fn progress_percent(succeeded: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (succeeded.min(total) * 100 / total) as u8
}

/// 带序号的句子
#[derive(Debug, Clone)]
pub struct SentenceRecord {
    pub ordinal: usize,
    pub sentence: Sentence,
}

impl SentenceRecord {
    /// 从任务中取出指定句子，跳过已不存在的 ID
    pub fn collect(task: &Task, ids: &[SentenceId]) -> Vec<SentenceRecord> {
        ids.iter()
            .filter_map(|id| {
                let ordinal = task.ordinal_of(*id)?;
                Some(SentenceRecord {
                    ordinal,
                    sentence: task.sentences()[ordinal].clone(),
                })
            })
            .collect()
    }
}

/// Task Repository Port
///
/// 句子总是随任务整体读写，保证读者看到的要么是旧序列要么是新序列
#[async_trait]
pub trait TaskRepositoryPort: Send + Sync {
    /// 保存任务及全部句子（单个事务内整体替换句子序列）
    async fn save(&self, task: &Task) -> Result<(), RepositoryError>;

    /// 加载任务聚合（句子按序号排列）
    async fn find_by_id(&self, id: TaskId) -> Result<Option<Task>, RepositoryError>;

    /// 任务概要
    async fn find_summary(&self, id: TaskId) -> Result<Option<TaskSummary>, RepositoryError>;

    /// 分页列出任务（按创建时间倒序）
    async fn list(&self, page: PageRequest) -> Result<Page<TaskSummary>, RepositoryError>;

    /// 更新任务状态
    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), RepositoryError>;

    /// 删除任务及其句子
    async fn delete(&self, id: TaskId) -> Result<bool, RepositoryError>;

    /// 句子所属任务
    async fn find_task_id_by_sentence(
        &self,
        sentence_id: SentenceId,
    ) -> Result<Option<TaskId>, RepositoryError>;

    /// 单个句子
    async fn find_sentence(
        &self,
        sentence_id: SentenceId,
    ) -> Result<Option<SentenceRecord>, RepositoryError>;

    /// 分页列出任务的句子（按序号）
    async fn list_sentences(
        &self,
        task_id: TaskId,
        page: PageRequest,
    ) -> Result<Page<SentenceRecord>, RepositoryError>;

    /// 只更新句子的合成结果；句子已不存在时返回 false
    async fn save_synthesis(
        &self,
        sentence_id: SentenceId,
        synthesis: &SentenceSynthesis,
    ) -> Result<bool, RepositoryError>;

    /// 启动时把残留的 queued / running 句子标记为失败
    async fn fail_active_synthesis(&self, reason: &str) -> Result<usize, RepositoryError>;
}

// ============================================================================
// Reading Rule Repository
// ============================================================================

/// 规则列表过滤条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFilter {
    /// 给定任务时为全局规则 + 该任务的规则，否则为全部规则
    All { task_id: Option<TaskId> },
    Global,
    Task(TaskId),
}

/// Reading Rule Repository Port
#[async_trait]
pub trait ReadingRuleRepositoryPort: Send + Sync {
    /// 保存规则；(scope, task_id, rule_type, pattern) 重复时返回 Duplicate
    async fn save(&self, rule: &ReadingRule) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: RuleId) -> Result<Option<ReadingRule>, RepositoryError>;

    /// 按创建顺序列出
    async fn list(&self, filter: RuleFilter) -> Result<Vec<ReadingRule>, RepositoryError>;

    /// 删除规则及其启用设置
    async fn delete(&self, id: RuleId) -> Result<bool, RepositoryError>;

    /// 插入或覆盖 (rule_id, task_id, sentence_id) 的启用设置
    async fn save_setting(&self, setting: &RuleSetting) -> Result<(), RepositoryError>;

    async fn remove_setting(
        &self,
        rule_id: RuleId,
        task_id: TaskId,
        sentence_id: Option<SentenceId>,
    ) -> Result<bool, RepositoryError>;

    /// 任务内的全部启用设置
    async fn list_settings(&self, task_id: TaskId) -> Result<Vec<RuleSetting>, RepositoryError>;
}

// ============================================================================
// Merge Repository
// ============================================================================

/// 合并任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl MergeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeState::Queued => "queued",
            MergeState::Running => "running",
            MergeState::Succeeded => "succeeded",
            MergeState::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(MergeState::Queued),
            "running" => Some(MergeState::Running),
            "succeeded" => Some(MergeState::Succeeded),
            "failed" => Some(MergeState::Failed),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, MergeState::Queued | MergeState::Running)
    }
}

/// 合并任务
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub id: Uuid,
    pub task_id: TaskId,
    /// 调用方给定的拼接顺序
    pub sentence_ids: Vec<SentenceId>,
    pub state: MergeState,
    pub audio_key: Option<String>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MergeJob {
    pub fn new(task_id: TaskId, sentence_ids: Vec<SentenceId>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_id,
            sentence_ids,
            state: MergeState::Queued,
            audio_key: None,
            duration_ms: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn references(&self, sentence_id: SentenceId) -> bool {
        self.sentence_ids.contains(&sentence_id)
    }

    pub fn start(&mut self) {
        self.state = MergeState::Running;
        self.updated_at = Utc::now();
    }

    pub fn succeed(&mut self, audio_key: String, duration_ms: u64) {
        self.state = MergeState::Succeeded;
        self.audio_key = Some(audio_key);
        self.duration_ms = Some(duration_ms);
        self.error = None;
        self.updated_at = Utc::now();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.state = MergeState::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }
}

/// Merge Repository Port
#[async_trait]
pub trait MergeRepositoryPort: Send + Sync {
    /// 插入或更新
    async fn save(&self, job: &MergeJob) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MergeJob>, RepositoryError>;

    /// 任务的全部合并任务（按创建时间倒序）
    async fn list_by_task(&self, task_id: TaskId) -> Result<Vec<MergeJob>, RepositoryError>;

    /// 任务中处于 queued / running 的合并任务
    async fn find_active_by_task(&self, task_id: TaskId) -> Result<Vec<MergeJob>, RepositoryError>;

    /// 启动时把残留的 queued / running 合并任务标记为失败
    async fn fail_active(&self, reason: &str) -> Result<usize, RepositoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest::default().offset(), 0);
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
        assert_eq!(PageRequest::new(Some(0), Some(10)).offset(), 0);
    }

    #[test]
    fn test_progress_rounds_down() {
        assert_eq!(progress_percent(0, 0), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 66);
        assert_eq!(progress_percent(3, 3), 100);
    }
}
