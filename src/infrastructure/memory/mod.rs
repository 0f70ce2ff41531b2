//! Memory Layer - In-Memory State Management
//!
//! 合成任务表、任务级互斥锁与合并队列的内存实现

mod merge_queue;
mod synthesis_jobs;
mod task_locks;

pub use merge_queue::ChannelMergeQueue;
pub use synthesis_jobs::InMemorySynthesisJobManager;
pub use task_locks::InMemoryTaskLocks;
