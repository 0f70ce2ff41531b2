//! Reading Rule Context - Errors

use thiserror::Error;

use super::RuleId;
use crate::domain::task::TaskId;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("匹配模式不能为空")]
    EmptyPattern,

    #[error("任务级阅读规则必须指定 task_id")]
    MissingTask,

    #[error("全局阅读规则不能指定 task_id")]
    UnexpectedTask,

    #[error("数字读法规则的匹配模式必须为纯数字: {0}")]
    InvalidNumberPattern(String),

    #[error("未知的规则类型: {0}")]
    UnknownRuleType(String),

    #[error("未知的规则范围: {0}")]
    UnknownScope(String),

    #[error("阅读规则 {rule_id} 不适用于任务 {task_id}")]
    OutOfScope { rule_id: RuleId, task_id: TaskId },
}
