//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod merge_commands;
mod rule_commands;
mod sentence_commands;
mod synthesis_commands;
mod task_commands;

pub mod handlers;

pub use merge_commands::*;
pub use rule_commands::*;
pub use sentence_commands::*;
pub use synthesis_commands::*;
pub use task_commands::*;
