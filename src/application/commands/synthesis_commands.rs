//! Synthesis Commands

use crate::domain::task::{Patch, SentenceEdit, SentenceId, TaskId};

/// 合成前写入句子的音色参数（仅提供的字段生效）
#[derive(Debug, Clone, Default)]
pub struct VoiceOverride {
    pub voice_id: Patch<Option<String>>,
    pub speech_rate: Patch<i32>,
    pub volume: Patch<i32>,
    pub pitch: Patch<i32>,
}

impl VoiceOverride {
    pub fn is_empty(&self) -> bool {
        !(self.voice_id.is_set()
            || self.speech_rate.is_set()
            || self.volume.is_set()
            || self.pitch.is_set())
    }

    pub fn to_edit(&self) -> SentenceEdit {
        SentenceEdit {
            voice_id: self.voice_id.clone(),
            speech_rate: self.speech_rate.clone(),
            volume: self.volume.clone(),
            pitch: self.pitch.clone(),
            ..Default::default()
        }
    }
}

/// 合成单个句子（已有排队/运行中的任务时直接返回该任务）
#[derive(Debug, Clone)]
pub struct SynthesizeSentence {
    pub sentence_id: SentenceId,
    pub voice: VoiceOverride,
}

/// 重新合成单个句子（总是创建新任务）
#[derive(Debug, Clone)]
pub struct ResynthesizeSentence {
    pub sentence_id: SentenceId,
    pub voice: VoiceOverride,
}

/// 批量合成；sentence_ids 为空时合成任务的全部句子
#[derive(Debug, Clone)]
pub struct BatchSynthesize {
    pub task_id: TaskId,
    pub sentence_ids: Vec<SentenceId>,
    pub voice: VoiceOverride,
}
