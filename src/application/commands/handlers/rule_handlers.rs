//! Reading Rule Command Handlers

use std::sync::Arc;

use crate::application::commands::handlers::sentence_handlers::lock_task;
use crate::application::commands::{
    ApplyReadingRule, CreateReadingRule, DeleteReadingRule, SetRuleSetting,
};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ReadingRuleRepositoryPort, RepositoryError, TaskLockPort, TaskRepositoryPort,
};
use crate::domain::reading_rule::{ReadingRule, RuleSetting, RuleSwitches};

/// CreateReadingRule Handler
pub struct CreateReadingRuleHandler {
    rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
}

impl CreateReadingRuleHandler {
    pub fn new(
        rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
    ) -> Self {
        Self { rule_repo, task_repo }
    }

    pub async fn handle(&self, cmd: CreateReadingRule) -> Result<ReadingRule, ApplicationError> {
        let rule = ReadingRule::new(
            cmd.scope,
            cmd.task_id,
            cmd.rule_type,
            &cmd.pattern,
            &cmd.rule_value,
        )?;

        if let Some(task_id) = rule.task_id {
            if self.task_repo.find_summary(task_id).await?.is_none() {
                return Err(ApplicationError::not_found("Task", *task_id.as_uuid()));
            }
        }

        self.rule_repo.save(&rule).await.map_err(|e| match e {
            RepositoryError::Duplicate(_) => ApplicationError::conflict(format!(
                "已存在相同的{}规则: {}",
                rule.rule_type.label(),
                rule.pattern
            )),
            other => other.into(),
        })?;

        tracing::info!(
            rule_id = %rule.id,
            scope = rule.scope.as_str(),
            rule_type = rule.rule_type.as_str(),
            pattern = %rule.pattern,
            "Reading rule created"
        );

        Ok(rule)
    }
}

/// DeleteReadingRule Handler
pub struct DeleteReadingRuleHandler {
    rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
}

impl DeleteReadingRuleHandler {
    pub fn new(rule_repo: Arc<dyn ReadingRuleRepositoryPort>) -> Self {
        Self { rule_repo }
    }

    pub async fn handle(&self, cmd: DeleteReadingRule) -> Result<(), ApplicationError> {
        if !self.rule_repo.delete(cmd.rule_id).await? {
            return Err(ApplicationError::not_found("ReadingRule", *cmd.rule_id.as_uuid()));
        }
        tracing::info!(rule_id = %cmd.rule_id, "Reading rule deleted");
        Ok(())
    }
}

/// ApplyReadingRule Handler - 替换任务中所有匹配的句子内容
pub struct ApplyReadingRuleHandler {
    rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    locks: Arc<dyn TaskLockPort>,
}

impl ApplyReadingRuleHandler {
    pub fn new(
        rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        locks: Arc<dyn TaskLockPort>,
    ) -> Self {
        Self {
            rule_repo,
            task_repo,
            locks,
        }
    }

    /// 返回内容发生变化的句子数
    pub async fn handle(&self, cmd: ApplyReadingRule) -> Result<usize, ApplicationError> {
        let rule = self
            .rule_repo
            .find_by_id(cmd.rule_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("ReadingRule", *cmd.rule_id.as_uuid()))?;

        let (_guard, mut task) =
            lock_task(self.task_repo.as_ref(), self.locks.as_ref(), cmd.task_id).await?;
        rule.ensure_applies_to(cmd.task_id)?;

        let switches = RuleSwitches::new(self.rule_repo.list_settings(cmd.task_id).await?);
        let changed = task.rewrite_contents(|sentence_id, text| {
            if switches.enabled_for_sentence(rule.id, sentence_id) {
                rule.apply_to(text)
            } else {
                None
            }
        })?;
        if !changed.is_empty() {
            self.task_repo.save(&task).await?;
        }

        tracing::info!(
            rule_id = %rule.id,
            task_id = %cmd.task_id,
            modified = changed.len(),
            "Reading rule applied"
        );

        Ok(changed.len())
    }
}

/// SetRuleSetting Handler
pub struct SetRuleSettingHandler {
    rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
    task_repo: Arc<dyn TaskRepositoryPort>,
    locks: Arc<dyn TaskLockPort>,
}

impl SetRuleSettingHandler {
    pub fn new(
        rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
        task_repo: Arc<dyn TaskRepositoryPort>,
        locks: Arc<dyn TaskLockPort>,
    ) -> Self {
        Self {
            rule_repo,
            task_repo,
            locks,
        }
    }

    pub async fn handle(&self, cmd: SetRuleSetting) -> Result<RuleSetting, ApplicationError> {
        let rule = self
            .rule_repo
            .find_by_id(cmd.rule_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("ReadingRule", *cmd.rule_id.as_uuid()))?;

        let (_guard, task) =
            lock_task(self.task_repo.as_ref(), self.locks.as_ref(), cmd.task_id).await?;
        rule.ensure_applies_to(cmd.task_id)?;

        if let Some(sentence_id) = cmd.sentence_id {
            if task.ordinal_of(sentence_id).is_none() {
                return Err(match self.task_repo.find_task_id_by_sentence(sentence_id).await? {
                    Some(_) => ApplicationError::validation("句子不属于该任务"),
                    None => ApplicationError::not_found("Sentence", *sentence_id.as_uuid()),
                });
            }
        }

        let setting = RuleSetting::new(rule.id, cmd.task_id, cmd.sentence_id, cmd.enabled);
        if setting.is_default() {
            self.rule_repo
                .remove_setting(rule.id, cmd.task_id, None)
                .await?;
        } else {
            self.rule_repo.save_setting(&setting).await?;
        }

        tracing::info!(
            rule_id = %rule.id,
            task_id = %cmd.task_id,
            sentence_id = ?cmd.sentence_id,
            enabled = cmd.enabled,
            "Reading rule setting updated"
        );

        Ok(setting)
    }
}
