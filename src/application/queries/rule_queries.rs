//! Reading Rule Queries

use crate::application::ports::RuleFilter;
use crate::domain::task::TaskId;

/// 列出阅读规则（按创建顺序）
#[derive(Debug, Clone)]
pub struct ListReadingRules {
    pub filter: RuleFilter,
}

/// 在文本中查找可用规则的全部匹配
#[derive(Debug, Clone)]
pub struct MatchReadingRules {
    pub text: String,
    /// None 时只使用全局规则
    pub task_id: Option<TaskId>,
}
