//! Reading Rule Commands

use crate::domain::reading_rule::{RuleId, RuleScope, RuleType};
use crate::domain::task::{SentenceId, TaskId};

/// 创建阅读规则
#[derive(Debug, Clone)]
pub struct CreateReadingRule {
    pub scope: RuleScope,
    pub task_id: Option<TaskId>,
    pub rule_type: RuleType,
    pub pattern: String,
    pub rule_value: String,
}

/// 删除阅读规则
#[derive(Debug, Clone)]
pub struct DeleteReadingRule {
    pub rule_id: RuleId,
}

/// 把规则应用到任务的全部句子
#[derive(Debug, Clone)]
pub struct ApplyReadingRule {
    pub rule_id: RuleId,
    pub task_id: TaskId,
}

/// 在任务或单个句子上启用/停用规则
#[derive(Debug, Clone)]
pub struct SetRuleSetting {
    pub rule_id: RuleId,
    pub task_id: TaskId,
    /// None 时作用于整个任务
    pub sentence_id: Option<SentenceId>,
    pub enabled: bool,
}
