//! Reading Rule Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{ReadingRuleRepositoryPort, RuleFilter};
use crate::application::queries::{ListReadingRules, MatchReadingRules};
use crate::domain::reading_rule::{ReadingRule, RuleId, RuleSwitches, RuleType};

/// 一次规则命中
#[derive(Debug, Clone)]
pub struct RuleHit {
    pub rule_id: RuleId,
    pub rule_type: RuleType,
    pub pattern: String,
    pub rule_value: String,
    /// 字符偏移，左闭右开
    pub start: usize,
    pub end: usize,
}

/// 规则及其在查询任务中的启用状态
#[derive(Debug, Clone)]
pub struct RuleEntry {
    pub rule: ReadingRule,
    /// 未指定任务时恒为 true
    pub enabled: bool,
}

/// ListReadingRules Handler
pub struct ListReadingRulesHandler {
    rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
}

impl ListReadingRulesHandler {
    pub fn new(rule_repo: Arc<dyn ReadingRuleRepositoryPort>) -> Self {
        Self { rule_repo }
    }

    pub async fn handle(
        &self,
        query: ListReadingRules,
    ) -> Result<Vec<RuleEntry>, ApplicationError> {
        let rules = self.rule_repo.list(query.filter).await?;
        let switches = match query.filter {
            RuleFilter::All {
                task_id: Some(task_id),
            }
            | RuleFilter::Task(task_id) => {
                RuleSwitches::new(self.rule_repo.list_settings(task_id).await?)
            }
            _ => RuleSwitches::default(),
        };

        Ok(rules
            .into_iter()
            .map(|rule| RuleEntry {
                enabled: switches.enabled_for_task(rule.id),
                rule,
            })
            .collect())
    }
}

/// MatchReadingRules Handler
pub struct MatchReadingRulesHandler {
    rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
}

impl MatchReadingRulesHandler {
    pub fn new(rule_repo: Arc<dyn ReadingRuleRepositoryPort>) -> Self {
        Self { rule_repo }
    }

    pub async fn handle(&self, query: MatchReadingRules) -> Result<Vec<RuleHit>, ApplicationError> {
        let rules: Vec<ReadingRule> = match query.task_id {
            Some(task_id) => {
                let rules = self
                    .rule_repo
                    .list(RuleFilter::All {
                        task_id: Some(task_id),
                    })
                    .await?;
                let switches = RuleSwitches::new(self.rule_repo.list_settings(task_id).await?);
                // 任务级停用的规则不参与匹配
                rules
                    .into_iter()
                    .filter(|rule| switches.enabled_for_task(rule.id))
                    .collect()
            }
            None => self.rule_repo.list(RuleFilter::Global).await?,
        };
        Ok(collect_hits(&rules, &query.text))
    }
}

/// 按位置排序的全部命中
fn collect_hits(rules: &[ReadingRule], text: &str) -> Vec<RuleHit> {
    let mut hits: Vec<RuleHit> = rules
        .iter()
        .flat_map(|rule| {
            rule.find_matches(text).into_iter().map(move |m| RuleHit {
                rule_id: rule.id,
                rule_type: rule.rule_type,
                pattern: rule.pattern.clone(),
                rule_value: rule.rule_value.clone(),
                start: m.start,
                end: m.end,
            })
        })
        .collect();
    hits.sort_by_key(|h| (h.start, h.end));
    hits
}
