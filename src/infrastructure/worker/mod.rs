//! Worker Layer - Background Job Processing
//!
//! 合成与合并两个后台 Worker，各自消费一个有界队列

mod merge_worker;
mod synthesis_worker;

pub use merge_worker::{MergeWorker, MergeWorkerConfig};
pub use synthesis_worker::{SynthesisWorker, SynthesisWorkerConfig};
