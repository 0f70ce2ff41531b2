//! Sentence Commands

use crate::domain::task::{SentenceId, SettingsChange};

/// 删除句子
#[derive(Debug, Clone)]
pub struct DeleteSentence {
    pub sentence_id: SentenceId,
}

/// 组合设置：编辑参数 → 插入 → 重新断句
#[derive(Debug, Clone)]
pub struct UpdateSentenceSettings {
    pub sentence_id: SentenceId,
    pub change: SettingsChange,
}

/// 在句子下方插入新句
#[derive(Debug, Clone)]
pub struct InsertSentence {
    pub parent_id: SentenceId,
    pub content: String,
    pub voice_id: Option<String>,
}

/// 重新断句
#[derive(Debug, Clone)]
pub struct RebreakSentence {
    pub sentence_id: SentenceId,
    pub standard_id: u8,
    pub char_count: Option<usize>,
}
