//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod adapters;
pub mod events;
pub mod http;
pub mod memory;
pub mod persistence;
pub mod runtime;
pub mod worker;

pub use events::EventPublisher;
pub use memory::{ChannelMergeQueue, InMemorySynthesisJobManager, InMemoryTaskLocks};
pub use persistence::sled::SledAudioStore;
pub use runtime::{Runtime, RuntimeOptions};
pub use worker::{MergeWorker, MergeWorkerConfig, SynthesisWorker, SynthesisWorkerConfig};
