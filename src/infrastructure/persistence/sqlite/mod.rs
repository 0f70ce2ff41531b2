//! SQLite Persistence - SQLite 数据库持久化实现

mod database;
mod merge_repo;
mod reading_rule_repo;
mod task_repo;

pub use database::{create_pool, run_migrations, DatabaseConfig, DbPool};
pub use merge_repo::SqliteMergeRepository;
pub use reading_rule_repo::SqliteReadingRuleRepository;
pub use task_repo::SqliteTaskRepository;
