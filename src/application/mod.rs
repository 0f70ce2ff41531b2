//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（TtsEngine、Repository、SynthesisJobManager、TaskLock 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - orchestrator: 操作校验与分发
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod queries;

pub use error::ApplicationError;
pub use orchestrator::{Limits, Operation, OrchestratorDeps, Outcome, TaskOrchestrator};
