//! Audio Merger Port - 音频拼接
//!
//! CPU 密集的同步接口，调用方负责放到阻塞线程池执行

use thiserror::Error;

/// 拼接错误
#[derive(Debug, Error)]
pub enum MergeAudioError {
    #[error("No audio segments to merge")]
    Empty,

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Encode error: {0}")]
    EncodeError(String),
}

/// 拼接结果（16-bit PCM WAV）
#[derive(Debug, Clone)]
pub struct MergedAudio {
    pub data: Vec<u8>,
    pub duration_ms: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

pub trait AudioMergerPort: Send + Sync {
    /// 严格按给定顺序拼接 WAV 片段
    fn merge(&self, segments: &[Vec<u8>]) -> Result<MergedAudio, MergeAudioError>;
}
