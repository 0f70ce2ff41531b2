//! SQLite Database - 数据库连接和迁移

use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

use crate::application::ports::RepositoryError;

/// 数据库配置
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    pub database_url: String,
    /// 最大连接数
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:./data/narro.db?mode=rwc".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}?mode=rwc", path.as_ref().display()),
            max_connections: 5,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }
}

/// 数据库连接池
pub type DbPool = Pool<Sqlite>;

/// 创建数据库连接池
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    // 启用 WAL 模式，允许并发读写
    sqlx::query("PRAGMA journal_mode=WAL")
        .execute(&pool)
        .await?;

    // 遇到锁时等待而不是立即失败
    sqlx::query("PRAGMA busy_timeout=5000")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(&pool)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "SQLite pool created with WAL mode and busy_timeout=5000ms"
    );

    Ok(pool)
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    // 任务
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            standard INTEGER NOT NULL,
            char_count INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 句子：随任务整体替换，ordinal 从 0 连续
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sentences (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL,
            ordinal INTEGER NOT NULL,
            parent_id TEXT,
            content TEXT NOT NULL,
            voice_id TEXT,
            speech_rate INTEGER NOT NULL DEFAULT 0,
            volume INTEGER NOT NULL DEFAULT 0,
            pitch INTEGER NOT NULL DEFAULT 0,
            pauses TEXT NOT NULL DEFAULT '[]',
            synthesis_status TEXT NOT NULL DEFAULT 'not_synthesized',
            audio_key TEXT,
            audio_duration_ms INTEGER,
            synthesis_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
            UNIQUE (task_id, ordinal)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 阅读规则：seq 保留创建顺序，全局规则的 task_key 为空串
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reading_rules (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            scope TEXT NOT NULL,
            task_id TEXT,
            task_key TEXT NOT NULL DEFAULT '',
            rule_type TEXT NOT NULL,
            pattern TEXT NOT NULL,
            rule_value TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 规则启用设置：任务级记录的 sentence_key 为空串
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS rule_settings (
            rule_id TEXT NOT NULL,
            task_id TEXT NOT NULL,
            sentence_key TEXT NOT NULL DEFAULT '',
            enabled INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (rule_id, task_id, sentence_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 合并任务
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS merges (
            id TEXT PRIMARY KEY,
            task_id TEXT NOT NULL,
            sentence_ids TEXT NOT NULL,
            state TEXT NOT NULL,
            audio_key TEXT,
            duration_ms INTEGER,
            error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 创建索引
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sentences_task_id
        ON sentences(task_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_reading_rules_unique
        ON reading_rules(scope, task_key, rule_type, pattern)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_rule_settings_task_id
        ON rule_settings(task_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_merges_task_id
        ON merges(task_id)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_tasks_created_at
        ON tasks(created_at)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed");
    Ok(())
}

/// sqlx 错误转换
pub(crate) fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::DatabaseError(e.to_string())
}

pub(crate) fn serialization_error(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::SerializationError(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_db() {
        let config = DatabaseConfig::in_memory();
        let pool = create_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // 迁移可重复执行
        run_migrations(&pool).await.unwrap();
    }
}
