//! TTS Engine Port - 语音合成服务抽象
//!
//! 定义合成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::domain::task::{Pause, VoiceParams};

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),
}

/// 合成请求
#[derive(Debug, Clone, Serialize)]
pub struct InferRequest {
    /// 纯文本内容
    pub text: String,
    /// 带音色、韵律与停顿标记的 SSML
    pub ssml: String,
    pub voice_id: Option<String>,
    pub speech_rate: i32,
    pub volume: i32,
    pub pitch: i32,
    pub pauses: Vec<PauseSpec>,
}

/// 停顿描述
#[derive(Debug, Clone, Serialize)]
pub struct PauseSpec {
    pub position: usize,
    pub duration_ms: u32,
    pub kind: &'static str,
}

impl InferRequest {
    pub fn new(text: &str, voice: &VoiceParams, pauses: &[Pause]) -> Self {
        Self {
            text: text.to_string(),
            ssml: crate::domain::render_ssml(text, voice, pauses),
            voice_id: voice.voice_id.clone(),
            speech_rate: voice.speech_rate,
            volume: voice.volume,
            pitch: voice.pitch,
            pauses: pauses
                .iter()
                .map(|p| PauseSpec {
                    position: p.position,
                    duration_ms: p.duration_ms,
                    kind: p.kind.as_str(),
                })
                .collect(),
        }
    }
}

/// 合成响应
#[derive(Debug, Clone)]
pub struct InferResponse {
    /// 原始音频数据（WAV）
    pub audio_data: Vec<u8>,
    /// 音频时长（毫秒）
    pub duration_ms: Option<u64>,
    /// 采样率
    pub sample_rate: Option<u32>,
}

/// TTS Engine Port
///
/// 外部合成服务的抽象接口
#[async_trait]
pub trait TtsEnginePort: Send + Sync {
    /// 合成单个句子
    async fn infer(&self, request: InferRequest) -> Result<InferResponse, TtsError>;

    /// 检查合成服务是否可用
    async fn health_check(&self) -> bool {
        true
    }
}
