//! Query Handlers 实现
//!
//! 所有 QueryHandler 的具体实现

mod merge_handlers;
mod rule_handlers;
mod synthesis_handlers;
mod task_handlers;
mod voice_handlers;

pub use merge_handlers::*;
pub use rule_handlers::*;
pub use synthesis_handlers::*;
pub use task_handlers::*;
pub use voice_handlers::*;
