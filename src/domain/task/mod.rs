//! Task Context - 任务限界上下文
//!
//! 职责:
//! - Task 聚合：有序句子集合及其生命周期
//! - 句子的插入、删除、重新断句与参数编辑

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::{
    InsertDraft, RebreakOutcome, RebreakSpec, SentenceEdit, SettingsChange, SettingsOutcome, Task,
    TaskStatus,
};
pub use entities::{AudioRef, Sentence, SentenceSynthesis, SynthesisStatus};
pub use errors::TaskError;
pub use value_objects::{
    normalize_pauses, Patch, Pause, PauseKind, SentenceId, TaskId, VoiceParams, PARAM_RANGE,
};
