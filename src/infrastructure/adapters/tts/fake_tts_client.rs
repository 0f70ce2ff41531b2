//! Fake TTS Client - 本地开发与测试用的合成客户端
//!
//! 不调用外部服务，按文本长度生成确定性的正弦波 WAV

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{InferRequest, InferResponse, TtsEnginePort, TtsError};
use crate::infrastructure::adapters::audio::encode_pcm16;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    pub sample_rate: u32,
    /// 每个字符对应的时长（毫秒）
    pub ms_per_char: u32,
    pub frequency_hz: f32,
    /// 模拟合成延迟
    pub latency: Duration,
    /// 指定音色 ID 时返回 VoiceNotFound，用于模拟无效音色
    pub unknown_voice: Option<String>,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            ms_per_char: 100,
            frequency_hz: 440.0,
            latency: Duration::from_millis(0),
            unknown_voice: None,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            ms_per_char = config.ms_per_char,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 已收到的合成请求数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn render(&self, text: &str) -> (Vec<u8>, u64) {
        let chars = text.chars().count().max(1) as u64;
        let duration_ms = chars * self.config.ms_per_char as u64;
        let rate = self.config.sample_rate;
        let frames = (duration_ms * rate as u64 / 1000) as usize;

        let step = std::f32::consts::TAU * self.config.frequency_hz / rate as f32;
        let samples: Vec<i16> = (0..frames)
            .map(|i| ((i as f32 * step).sin() * 0.3 * i16::MAX as f32) as i16)
            .collect();

        (encode_pcm16(&samples, rate, 1), duration_ms)
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn infer(&self, request: InferRequest) -> Result<InferResponse, TtsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            text_len = request.text.chars().count(),
            voice_id = ?request.voice_id,
            "FakeTtsClient: generating tone"
        );

        if !self.config.latency.is_zero() {
            tokio::time::sleep(self.config.latency).await;
        }

        if let (Some(unknown), Some(voice_id)) = (&self.config.unknown_voice, &request.voice_id) {
            if unknown == voice_id {
                return Err(TtsError::VoiceNotFound(voice_id.clone()));
            }
        }

        let (audio_data, duration_ms) = self.render(&request.text);

        Ok(InferResponse {
            audio_data,
            duration_ms: Some(duration_ms),
            sample_rate: Some(self.config.sample_rate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::VoiceParams;
    use crate::infrastructure::adapters::audio::parse_wav;

    #[tokio::test]
    async fn test_audio_sized_by_text() {
        let client = FakeTtsClient::with_defaults();
        let voice = VoiceParams::default();

        let response = client
            .infer(InferRequest::new("这是测试", &voice, &[]))
            .await
            .unwrap();

        assert_eq!(response.duration_ms, Some(400));
        assert_eq!(response.sample_rate, Some(16000));
        let info = parse_wav(&response.audio_data).unwrap();
        assert_eq!(info.duration_ms(), 400);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_output_is_deterministic() {
        let client = FakeTtsClient::with_defaults();
        let voice = VoiceParams::default();

        let a = client.infer(InferRequest::new("重复", &voice, &[])).await.unwrap();
        let b = client.infer(InferRequest::new("重复", &voice, &[])).await.unwrap();
        assert_eq!(a.audio_data, b.audio_data);
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_voice() {
        let client = FakeTtsClient::new(FakeTtsClientConfig {
            unknown_voice: Some("ghost".to_string()),
            ..Default::default()
        });
        let voice = VoiceParams::with_voice(Some("ghost".to_string()));

        let result = client.infer(InferRequest::new("你好", &voice, &[])).await;
        assert!(matches!(result, Err(TtsError::VoiceNotFound(v)) if v == "ghost"));
    }
}
