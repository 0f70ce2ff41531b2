//! SQLite Reading Rule Repository

use async_trait::async_trait;
use sqlx::FromRow;

use super::database::{db_error, serialization_error};
use super::task_repo::{parse_time, parse_uuid};
use super::DbPool;
use crate::application::ports::{ReadingRuleRepositoryPort, RepositoryError, RuleFilter};
use crate::domain::reading_rule::{ReadingRule, RuleId, RuleScope, RuleSetting, RuleType};
use crate::domain::task::{SentenceId, TaskId};

const RULE_COLUMNS: &str = "id, scope, task_id, rule_type, pattern, rule_value, created_at";

/// SQLite Reading Rule Repository
pub struct SqliteReadingRuleRepository {
    pool: DbPool,
}

impl SqliteReadingRuleRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct RuleRow {
    id: String,
    scope: String,
    task_id: Option<String>,
    rule_type: String,
    pattern: String,
    rule_value: String,
    created_at: String,
}

#[derive(FromRow)]
struct SettingRow {
    rule_id: String,
    task_id: String,
    sentence_key: String,
    enabled: bool,
    updated_at: String,
}

impl TryFrom<SettingRow> for RuleSetting {
    type Error = RepositoryError;

    fn try_from(row: SettingRow) -> Result<Self, Self::Error> {
        let sentence_id = match row.sentence_key.as_str() {
            "" => None,
            key => Some(SentenceId::from_uuid(parse_uuid(key)?)),
        };
        Ok(RuleSetting {
            rule_id: RuleId::from_uuid(parse_uuid(&row.rule_id)?),
            task_id: TaskId::from_uuid(parse_uuid(&row.task_id)?),
            sentence_id,
            enabled: row.enabled,
            updated_at: parse_time(&row.updated_at)?,
        })
    }
}

/// 任务级设置的 sentence_key 为空串
fn sentence_key(sentence_id: Option<SentenceId>) -> String {
    sentence_id.map(|id| id.to_string()).unwrap_or_default()
}

impl TryFrom<RuleRow> for ReadingRule {
    type Error = RepositoryError;

    fn try_from(row: RuleRow) -> Result<Self, Self::Error> {
        Ok(ReadingRule {
            id: RuleId::from_uuid(parse_uuid(&row.id)?),
            scope: RuleScope::parse(&row.scope).map_err(serialization_error)?,
            task_id: row
                .task_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(TaskId::from_uuid),
            rule_type: RuleType::parse(&row.rule_type).map_err(serialization_error)?,
            pattern: row.pattern,
            rule_value: row.rule_value,
            created_at: parse_time(&row.created_at)?,
        })
    }
}

#[async_trait]
impl ReadingRuleRepositoryPort for SqliteReadingRuleRepository {
    async fn save(&self, rule: &ReadingRule) -> Result<(), RepositoryError> {
        let task_id = rule.task_id.map(|id| id.to_string());

        sqlx::query(
            r#"
            INSERT INTO reading_rules
                (id, scope, task_id, task_key, rule_type, pattern, rule_value, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.id.to_string())
        .bind(rule.scope.as_str())
        .bind(task_id.as_deref())
        .bind(task_id.as_deref().unwrap_or(""))
        .bind(rule.rule_type.as_str())
        .bind(&rule.pattern)
        .bind(&rule.rule_value)
        .bind(rule.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if duplicate {
                RepositoryError::Duplicate(format!("{}:{}", rule.rule_type.as_str(), rule.pattern))
            } else {
                db_error(e)
            }
        })?;

        Ok(())
    }

    async fn find_by_id(&self, id: RuleId) -> Result<Option<ReadingRule>, RepositoryError> {
        let sql = format!("SELECT {} FROM reading_rules WHERE id = ?", RULE_COLUMNS);
        let row: Option<RuleRow> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(ReadingRule::try_from).transpose()
    }

    async fn list(&self, filter: RuleFilter) -> Result<Vec<ReadingRule>, RepositoryError> {
        let rows: Vec<RuleRow> = match filter {
            RuleFilter::All { task_id: None } => {
                let sql = format!("SELECT {} FROM reading_rules ORDER BY seq", RULE_COLUMNS);
                sqlx::query_as::<_, RuleRow>(&sql).fetch_all(&self.pool).await
            }
            RuleFilter::All {
                task_id: Some(task_id),
            } => {
                let sql = format!(
                    "SELECT {} FROM reading_rules \
                     WHERE scope = 'global' OR task_id = ? ORDER BY seq",
                    RULE_COLUMNS
                );
                sqlx::query_as::<_, RuleRow>(&sql)
                    .bind(task_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
            RuleFilter::Global => {
                let sql = format!(
                    "SELECT {} FROM reading_rules WHERE scope = 'global' ORDER BY seq",
                    RULE_COLUMNS
                );
                sqlx::query_as::<_, RuleRow>(&sql).fetch_all(&self.pool).await
            }
            RuleFilter::Task(task_id) => {
                let sql = format!(
                    "SELECT {} FROM reading_rules \
                     WHERE scope = 'task' AND task_id = ? ORDER BY seq",
                    RULE_COLUMNS
                );
                sqlx::query_as::<_, RuleRow>(&sql)
                    .bind(task_id.to_string())
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db_error)?;

        rows.into_iter().map(ReadingRule::try_from).collect()
    }

    async fn delete(&self, id: RuleId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("DELETE FROM rule_settings WHERE rule_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let result = sqlx::query("DELETE FROM reading_rules WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_setting(&self, setting: &RuleSetting) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO rule_settings (rule_id, task_id, sentence_key, enabled, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(rule_id, task_id, sentence_key) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(setting.rule_id.to_string())
        .bind(setting.task_id.to_string())
        .bind(sentence_key(setting.sentence_id))
        .bind(setting.enabled)
        .bind(setting.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn remove_setting(
        &self,
        rule_id: RuleId,
        task_id: TaskId,
        sentence_id: Option<SentenceId>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM rule_settings WHERE rule_id = ? AND task_id = ? AND sentence_key = ?",
        )
        .bind(rule_id.to_string())
        .bind(task_id.to_string())
        .bind(sentence_key(sentence_id))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_settings(&self, task_id: TaskId) -> Result<Vec<RuleSetting>, RepositoryError> {
        let rows: Vec<SettingRow> = sqlx::query_as(
            r#"
            SELECT rule_id, task_id, sentence_key, enabled, updated_at
            FROM rule_settings WHERE task_id = ?
            ORDER BY updated_at
            "#,
        )
        .bind(task_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(RuleSetting::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};

    async fn setup() -> SqliteReadingRuleRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteReadingRuleRepository::new(pool)
    }

    fn global(rule_type: RuleType, pattern: &str, value: &str) -> ReadingRule {
        ReadingRule::new(RuleScope::Global, None, rule_type, pattern, value).unwrap()
    }

    fn local(task_id: TaskId, rule_type: RuleType, pattern: &str, value: &str) -> ReadingRule {
        ReadingRule::new(RuleScope::Task, Some(task_id), rule_type, pattern, value).unwrap()
    }

    #[tokio::test]
    async fn test_list_in_creation_order() {
        let repo = setup().await;
        let task_id = TaskId::new();
        let other_task = TaskId::new();

        let a = global(RuleType::ProperNoun, "重庆", "chóng qìng");
        let b = local(task_id, RuleType::NumberReading, "2025", "二零二五");
        let c = local(other_task, RuleType::Phonetic, "行", "háng");
        for rule in [&a, &b, &c] {
            repo.save(rule).await.unwrap();
        }

        let all = repo.list(RuleFilter::All { task_id: None }).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id, b.id, c.id]);

        let visible = repo
            .list(RuleFilter::All {
                task_id: Some(task_id),
            })
            .await
            .unwrap();
        assert_eq!(visible.iter().map(|r| r.id).collect::<Vec<_>>(), vec![a.id, b.id]);

        let globals = repo.list(RuleFilter::Global).await.unwrap();
        assert_eq!(globals, vec![a.clone()]);

        let task_rules = repo.list(RuleFilter::Task(task_id)).await.unwrap();
        assert_eq!(task_rules.len(), 1);
        assert_eq!(task_rules[0].task_id, Some(task_id));
    }

    #[tokio::test]
    async fn test_duplicate_rule_rejected() {
        let repo = setup().await;
        repo.save(&global(RuleType::ProperNoun, "重庆", "chóng qìng"))
            .await
            .unwrap();

        let result = repo
            .save(&global(RuleType::ProperNoun, "重庆", "zhòng qìng"))
            .await;
        assert!(matches!(result, Err(RepositoryError::Duplicate(_))));

        // 不同类型不算重复
        repo.save(&global(RuleType::Phonetic, "重庆", "chóng qìng"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let repo = setup().await;
        let task_id = TaskId::new();
        let rule = global(RuleType::ProperNoun, "长安", "cháng ān");
        let task_rule = local(task_id, RuleType::ProperNoun, "长安", "zhǎng ān");
        repo.save(&rule).await.unwrap();
        repo.save(&task_rule).await.unwrap();

        assert!(repo.delete(task_rule.id).await.unwrap());
        assert!(repo.delete(rule.id).await.unwrap());
        assert!(!repo.delete(rule.id).await.unwrap());
        assert!(repo.find_by_id(rule.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_settings_upsert_and_remove() {
        let repo = setup().await;
        let task_id = TaskId::new();
        let sentence_id = SentenceId::new();
        let rule = global(RuleType::ProperNoun, "长安", "cháng ān");
        repo.save(&rule).await.unwrap();

        repo.save_setting(&RuleSetting::new(rule.id, task_id, None, false))
            .await
            .unwrap();
        repo.save_setting(&RuleSetting::new(rule.id, task_id, Some(sentence_id), false))
            .await
            .unwrap();
        // 同一键覆盖
        repo.save_setting(&RuleSetting::new(rule.id, task_id, Some(sentence_id), true))
            .await
            .unwrap();

        let settings = repo.list_settings(task_id).await.unwrap();
        assert_eq!(settings.len(), 2);
        let sentence = settings.iter().find(|s| s.sentence_id.is_some()).unwrap();
        assert_eq!(sentence.sentence_id, Some(sentence_id));
        assert!(sentence.enabled);
        assert!(repo.list_settings(TaskId::new()).await.unwrap().is_empty());

        assert!(repo.remove_setting(rule.id, task_id, None).await.unwrap());
        assert!(!repo.remove_setting(rule.id, task_id, None).await.unwrap());
        assert_eq!(repo.list_settings(task_id).await.unwrap().len(), 1);

        // 删除规则时一并删除其设置
        assert!(repo.delete(rule.id).await.unwrap());
        assert!(repo.list_settings(task_id).await.unwrap().is_empty());
    }
}
