//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod merge_handlers;
mod rule_handlers;
mod sentence_handlers;
mod synthesis_handlers;
mod task_handlers;

pub use merge_handlers::*;
pub use rule_handlers::*;
pub use sentence_handlers::{
    DeleteSentenceHandler, InsertSentenceHandler, RebreakResult, RebreakSentenceHandler,
    SentenceDeps, SettingsResult, UpdateSentenceSettingsHandler,
};
pub use synthesis_handlers::*;
pub use task_handlers::*;
