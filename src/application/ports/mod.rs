//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_merger;
mod audio_store;
mod merge_queue;
mod repositories;
mod synthesis_jobs;
mod task_lock;
mod tts_engine;

pub use audio_merger::{AudioMergerPort, MergeAudioError, MergedAudio};
pub use audio_store::{
    content_hash, merge_key, segment_key, sentence_prefix, task_prefixes, AudioMetadata,
    AudioStorePort, StoreError, StoreStats,
};
pub use merge_queue::MergeQueuePort;
pub use repositories::{
    progress_percent, MergeJob, MergeRepositoryPort, MergeState, Page, PageRequest,
    ReadingRuleRepositoryPort, RepositoryError, RuleFilter, SentenceRecord, TaskRepositoryPort,
    TaskSummary, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use synthesis_jobs::{
    JobError, JobState, SubmitMode, SubmitOutcome, SynthesisInput, SynthesisJob,
    SynthesisJobManagerPort,
};
pub use task_lock::{TaskGuard, TaskLockPort};
pub use tts_engine::{InferRequest, InferResponse, PauseSpec, TtsEnginePort, TtsError};
