//! Voice Queries

/// 列出音色目录
#[derive(Debug, Clone, Default)]
pub struct ListVoices {
    pub recommended: Option<bool>,
    pub language: Option<String>,
}
