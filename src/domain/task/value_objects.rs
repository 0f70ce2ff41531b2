//! Task Context - Value Objects

use serde::{Deserialize, Deserializer, Serialize};
use std::ops::RangeInclusive;
use uuid::Uuid;

use super::TaskError;

/// 任务唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 句子唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SentenceId(Uuid);

impl SentenceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SentenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SentenceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 语速、音量、音调的合法偏移范围（0 为中性值）
pub const PARAM_RANGE: RangeInclusive<i32> = -100..=100;

/// 音色参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceParams {
    /// 音色 ID，None 表示使用合成服务的默认音色
    pub voice_id: Option<String>,
    pub speech_rate: i32,
    pub volume: i32,
    pub pitch: i32,
}

impl VoiceParams {
    pub fn with_voice(voice_id: Option<String>) -> Self {
        Self {
            voice_id,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), TaskError> {
        for (name, value) in [
            ("speech_rate", self.speech_rate),
            ("volume", self.volume),
            ("pitch", self.pitch),
        ] {
            if !PARAM_RANGE.contains(&value) {
                return Err(TaskError::InvalidVoiceParams(format!(
                    "{} 超出范围 [{}, {}]: {}",
                    name,
                    PARAM_RANGE.start(),
                    PARAM_RANGE.end(),
                    value
                )));
            }
        }

        if let Some(voice_id) = &self.voice_id {
            if voice_id.trim().is_empty() {
                return Err(TaskError::InvalidVoiceParams("voice_id 不能为空字符串".to_string()));
            }
        }

        Ok(())
    }
}

/// 停顿类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseKind {
    /// 普通停顿
    Pause,
    /// 静音
    Silence,
}

impl PauseKind {
    pub fn code(&self) -> u8 {
        match self {
            PauseKind::Pause => 1,
            PauseKind::Silence => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(PauseKind::Pause),
            2 => Some(PauseKind::Silence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PauseKind::Pause => "pause",
            PauseKind::Silence => "silence",
        }
    }
}

/// 停顿标记
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pause {
    /// 插入位置（字符偏移，0..=字符数）
    pub position: usize,
    /// 持续时间（毫秒）
    pub duration_ms: u32,
    pub kind: PauseKind,
}

/// 校验停顿列表并按位置排序（同位置保持原顺序）
pub fn normalize_pauses(mut pauses: Vec<Pause>, content: &str) -> Result<Vec<Pause>, TaskError> {
    let len = content.chars().count();
    for pause in &pauses {
        if pause.position > len {
            return Err(TaskError::InvalidPause(format!(
                "位置 {} 超出句子长度 {}",
                pause.position, len
            )));
        }
        if pause.duration_ms == 0 {
            return Err(TaskError::InvalidPause("停顿时长必须大于 0".to_string()));
        }
    }
    pauses.sort_by_key(|p| p.position);
    Ok(pauses)
}

/// 部分更新字段：区分「未提供」与「设置为某值」
///
/// 反序列化时字段出现即为 `Set`，配合 `#[serde(default)]` 缺省为 `Absent`。
/// `Patch<Option<T>>` 中的 JSON null 表示显式清空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Absent => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Absent => None,
        }
    }

    /// 提供时覆盖目标值
    pub fn apply_to(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        volume: Patch<i32>,
        #[serde(default)]
        voice_id: Patch<Option<String>>,
    }

    #[test]
    fn test_patch_distinguishes_absent_from_zero() {
        let body: Body = serde_json::from_str("{}").unwrap();
        assert_eq!(body.volume, Patch::Absent);
        assert_eq!(body.voice_id, Patch::Absent);

        let body: Body = serde_json::from_str(r#"{"volume": 0, "voice_id": null}"#).unwrap();
        assert_eq!(body.volume, Patch::Set(0));
        assert_eq!(body.voice_id, Patch::Set(None));
    }

    #[test]
    fn test_patch_rejects_null_for_plain_field() {
        let result: Result<Body, _> = serde_json::from_str(r#"{"volume": null}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_voice_params_range() {
        let mut params = VoiceParams::default();
        assert!(params.validate().is_ok());

        params.pitch = 101;
        assert!(matches!(params.validate(), Err(TaskError::InvalidVoiceParams(_))));

        params.pitch = -100;
        params.voice_id = Some("  ".to_string());
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_normalize_pauses() {
        let pauses = vec![
            Pause {
                position: 3,
                duration_ms: 200,
                kind: PauseKind::Pause,
            },
            Pause {
                position: 1,
                duration_ms: 500,
                kind: PauseKind::Silence,
            },
        ];
        let sorted = normalize_pauses(pauses, "一二三").unwrap();
        assert_eq!(sorted[0].position, 1);
        assert_eq!(sorted[1].position, 3);

        let out_of_range = vec![Pause {
            position: 4,
            duration_ms: 200,
            kind: PauseKind::Pause,
        }];
        assert!(normalize_pauses(out_of_range, "一二三").is_err());
    }
}
