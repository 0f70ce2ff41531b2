//! Reading Rule Context - 阅读规则限界上下文
//!
//! 职责:
//! - 模式 → 读法 的替换规则（任务级或全局）
//! - 在文本中定位匹配并执行替换
//! - 按任务或句子开关规则

mod errors;
mod rule;
mod setting;

pub use errors::RuleError;
pub use rule::{ReadingRule, RuleId, RuleMatch, RuleScope, RuleType};
pub use setting::{RuleSetting, RuleSwitches};
