//! Narro - 长文本分句合成后端
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Task: 任务聚合（句子序列、插入、删除、重新断句）
//! - Reading Rule: 读法规则（数字读法、音标、专有词汇）
//! - Text Segmenter: 断句标准
//!
//! 应用层 (application/):
//! - Ports: TtsEngine、Repositories、AudioStore、SynthesisJobManager、TaskLock、MergeQueue
//! - Commands / Queries: CQRS 处理器
//! - Orchestrator: 操作校验与分发
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Memory: 合成任务表、任务锁、合并队列
//! - Worker: 合成与合并后台 Worker
//! - Persistence: SQLite + Sled 存储
//! - Adapters: TTS Client、WAV 合并
//! - Events: 任务进度事件推送

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{load_config, AppConfig};
