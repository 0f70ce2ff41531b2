//! Task Context - Entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Pause, SentenceId, TaskId, VoiceParams};

/// 句子合成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisStatus {
    #[default]
    NotSynthesized,
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl SynthesisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisStatus::NotSynthesized => "not_synthesized",
            SynthesisStatus::Queued => "queued",
            SynthesisStatus::Running => "running",
            SynthesisStatus::Succeeded => "succeeded",
            SynthesisStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_synthesized" => Some(SynthesisStatus::NotSynthesized),
            "queued" => Some(SynthesisStatus::Queued),
            "running" => Some(SynthesisStatus::Running),
            "succeeded" => Some(SynthesisStatus::Succeeded),
            "failed" => Some(SynthesisStatus::Failed),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SynthesisStatus::Queued | SynthesisStatus::Running)
    }
}

/// 已合成音频片段的引用
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    /// 音频存储中的 key
    pub key: String,
    pub duration_ms: u64,
}

/// 句子的合成结果
///
/// `audio` 只在新的合成成功时被替换，失败时保留上一次成功的片段。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceSynthesis {
    pub status: SynthesisStatus,
    pub audio: Option<AudioRef>,
    pub error: Option<String>,
}

/// 句子 - 合成与编辑的最小单位
///
/// 不变量:
/// - 只属于一个 Task，序号由其在 Task 中的位置决定
/// - content 不可为空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub id: SentenceId,
    pub task_id: TaskId,
    /// 由插入或重新断句产生时记录来源句子
    pub parent_id: Option<SentenceId>,
    pub content: String,
    pub voice: VoiceParams,
    pub pauses: Vec<Pause>,
    pub synthesis: SentenceSynthesis,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sentence {
    pub fn new(
        task_id: TaskId,
        content: String,
        voice: VoiceParams,
        parent_id: Option<SentenceId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SentenceId::new(),
            task_id,
            parent_id,
            content,
            voice,
            pauses: Vec::new(),
            synthesis: SentenceSynthesis::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }

    pub fn has_segment(&self) -> bool {
        self.synthesis.audio.is_some()
    }

    /// 内容变化后丢弃越界的停顿
    pub(crate) fn clamp_pauses(&mut self) {
        let len = self.char_count();
        self.pauses.retain(|p| p.position <= len);
    }
}
