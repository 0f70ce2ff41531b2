//! Reading Rule Context - 启用设置

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RuleId;
use crate::domain::task::{SentenceId, TaskId};

/// 规则在任务或单个句子上的启用状态
///
/// 没有记录时规则默认启用；句子级记录优先于任务级记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetting {
    pub rule_id: RuleId,
    pub task_id: TaskId,
    pub sentence_id: Option<SentenceId>,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl RuleSetting {
    pub fn new(
        rule_id: RuleId,
        task_id: TaskId,
        sentence_id: Option<SentenceId>,
        enabled: bool,
    ) -> Self {
        Self {
            rule_id,
            task_id,
            sentence_id,
            enabled,
            updated_at: Utc::now(),
        }
    }

    /// 任务级启用与无记录等价
    pub fn is_default(&self) -> bool {
        self.sentence_id.is_none() && self.enabled
    }
}

/// 一个任务内全部规则的启用开关
#[derive(Debug, Clone, Default)]
pub struct RuleSwitches {
    task: HashMap<RuleId, bool>,
    sentence: HashMap<(RuleId, SentenceId), bool>,
}

impl RuleSwitches {
    pub fn new(settings: impl IntoIterator<Item = RuleSetting>) -> Self {
        let mut switches = Self::default();
        for setting in settings {
            match setting.sentence_id {
                Some(sentence_id) => {
                    switches
                        .sentence
                        .insert((setting.rule_id, sentence_id), setting.enabled);
                }
                None => {
                    switches.task.insert(setting.rule_id, setting.enabled);
                }
            }
        }
        switches
    }

    pub fn enabled_for_task(&self, rule_id: RuleId) -> bool {
        self.task.get(&rule_id).copied().unwrap_or(true)
    }

    pub fn enabled_for_sentence(&self, rule_id: RuleId, sentence_id: SentenceId) -> bool {
        self.sentence
            .get(&(rule_id, sentence_id))
            .copied()
            .unwrap_or_else(|| self.enabled_for_task(rule_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_enabled_without_settings() {
        let switches = RuleSwitches::default();
        assert!(switches.enabled_for_task(RuleId::new()));
        assert!(switches.enabled_for_sentence(RuleId::new(), SentenceId::new()));
    }

    #[test]
    fn test_sentence_setting_overrides_task() {
        let rule = RuleId::new();
        let task = TaskId::new();
        let kept = SentenceId::new();
        let other = SentenceId::new();

        let switches = RuleSwitches::new(vec![
            RuleSetting::new(rule, task, None, false),
            RuleSetting::new(rule, task, Some(kept), true),
        ]);

        assert!(!switches.enabled_for_task(rule));
        assert!(switches.enabled_for_sentence(rule, kept));
        assert!(!switches.enabled_for_sentence(rule, other));
    }

    #[test]
    fn test_default_setting() {
        let rule = RuleId::new();
        let task = TaskId::new();
        assert!(RuleSetting::new(rule, task, None, true).is_default());
        assert!(!RuleSetting::new(rule, task, None, false).is_default());
        assert!(!RuleSetting::new(rule, task, Some(SentenceId::new()), true).is_default());
    }
}
