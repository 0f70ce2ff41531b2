//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod merge_queries;
mod rule_queries;
mod synthesis_queries;
mod task_queries;
mod voice_queries;

pub mod handlers;

pub use merge_queries::*;
pub use rule_queries::*;
pub use synthesis_queries::*;
pub use task_queries::*;
pub use voice_queries::*;
