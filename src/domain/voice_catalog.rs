//! 音色目录
//!
//! 可供前端选择的音色，来自配置；合成时 voice_id 原样交给 TTS 服务。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// 音色条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    pub name: String,
    /// 如 "male" / "female" / "child"
    pub voice_type: String,
    /// BCP 47 语言标签，如 "zh-CN"
    pub language: String,
    #[serde(default)]
    pub recommended: bool,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// 目录过滤条件，None 表示不过滤
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceFilter {
    pub recommended: Option<bool>,
    pub language: Option<String>,
}

impl VoiceFilter {
    fn accepts(&self, voice: &VoiceProfile) -> bool {
        self.recommended.map_or(true, |r| voice.recommended == r)
            && self
                .language
                .as_deref()
                .map_or(true, |lang| voice.language.eq_ignore_ascii_case(lang))
    }
}

/// 按 sort_order 排列的音色目录
#[derive(Debug, Clone, Default)]
pub struct VoiceCatalog {
    voices: Vec<VoiceProfile>,
}

impl VoiceCatalog {
    /// voice_id 为空或重复时返回该 voice_id
    pub fn new(mut voices: Vec<VoiceProfile>) -> Result<Self, String> {
        let mut seen = HashSet::new();
        for voice in &voices {
            if voice.voice_id.trim().is_empty() || !seen.insert(voice.voice_id.as_str()) {
                return Err(voice.voice_id.clone());
            }
        }
        // 稳定排序，同序号保持配置顺序
        voices.sort_by_key(|v| v.sort_order);
        Ok(Self { voices })
    }

    pub fn list(&self, filter: &VoiceFilter) -> Vec<VoiceProfile> {
        self.voices
            .iter()
            .filter(|v| filter.accepts(v))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(id: &str, language: &str, recommended: bool, sort_order: i32) -> VoiceProfile {
        VoiceProfile {
            voice_id: id.to_string(),
            name: id.to_string(),
            voice_type: "female".to_string(),
            language: language.to_string(),
            recommended,
            sort_order,
            avatar_url: None,
        }
    }

    #[test]
    fn test_list_sorted_and_filtered() {
        let catalog = VoiceCatalog::new(vec![
            voice("c", "zh-CN", true, 3),
            voice("a", "zh-CN", false, 1),
            voice("b", "en-US", true, 2),
        ])
        .unwrap();

        let ids = |voices: Vec<VoiceProfile>| -> Vec<String> {
            voices.into_iter().map(|v| v.voice_id).collect()
        };
        assert_eq!(ids(catalog.list(&VoiceFilter::default())), vec!["a", "b", "c"]);

        let recommended = VoiceFilter {
            recommended: Some(true),
            language: None,
        };
        assert_eq!(ids(catalog.list(&recommended)), vec!["b", "c"]);

        let chinese = VoiceFilter {
            recommended: None,
            language: Some("zh-cn".to_string()),
        };
        assert_eq!(ids(catalog.list(&chinese)), vec!["a", "c"]);
    }

    #[test]
    fn test_duplicate_or_blank_ids_rejected() {
        let dup = VoiceCatalog::new(vec![
            voice("a", "zh-CN", true, 1),
            voice("a", "zh-CN", false, 2),
        ]);
        assert_eq!(dup.unwrap_err(), "a");

        let blank = VoiceCatalog::new(vec![voice(" ", "zh-CN", true, 1)]);
        assert!(blank.is_err());
    }
}
