//! Persistence Layer - 数据持久化
//!
//! SQLite 保存任务、规则与合并记录，Sled 保存音频数据

pub mod sled;
pub mod sqlite;

pub use self::sled::SledAudioStore;
