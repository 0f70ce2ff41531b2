//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Task Context: 任务与有序句子集合
//! - Reading Rule Context: 阅读规则
//!
//! 以及共享的文本分割器、SSML 渲染与音色目录。

pub mod reading_rule;
pub mod task;

mod ssml;
mod text_segmenter;
mod voice_catalog;

pub use ssml::render_ssml;
pub use text_segmenter::{
    segment, BreakingStandard, SegmentError, SegmentParams, DEFAULT_MAX_TEXT_CHARS,
};
pub use voice_catalog::{VoiceCatalog, VoiceFilter, VoiceProfile};
