//! HTTP TTS Client - 逐句调用外部合成服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/synthesize
//! Request: {"text", "ssml", "voice_id", "speech_rate", "volume", "pitch", "pauses"} (JSON)
//! Response: audio/wav binary, metadata in headers

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::application::ports::{InferRequest, InferResponse, TtsEnginePort, TtsError};
use crate::infrastructure::adapters::audio::parse_wav;

const DURATION_HEADER: &str = "X-TTS-Duration-Ms";
const SAMPLE_RATE_HEADER: &str = "X-TTS-Sample-Rate";

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 60,
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP TTS 客户端
///
/// 失败不重试，由任务状态记录原因
pub struct HttpTtsClient {
    client: Client,
    config: HttpTtsClientConfig,
}

impl HttpTtsClient {
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn synthesize_url(&self) -> String {
        format!(
            "{}/api/tts/synthesize",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }
}

fn header_value<T: std::str::FromStr>(
    headers: &reqwest::header::HeaderMap,
    name: &str,
) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl TtsEnginePort for HttpTtsClient {
    async fn infer(&self, request: InferRequest) -> Result<InferResponse, TtsError> {
        tracing::debug!(
            url = %self.synthesize_url(),
            text_len = request.text.chars().count(),
            voice_id = ?request.voice_id,
            "Sending TTS synthesize request"
        );

        let response = self
            .client
            .post(self.synthesize_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TtsError::Timeout
                } else if e.is_connect() {
                    TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
                } else {
                    TtsError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if status == StatusCode::NOT_FOUND {
                if let Some(voice_id) = request.voice_id {
                    return Err(TtsError::VoiceNotFound(voice_id));
                }
            }
            return Err(TtsError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let headers = response.headers();
        let header_duration: Option<u64> = header_value(headers, DURATION_HEADER);
        let header_sample_rate: Option<u32> = header_value(headers, SAMPLE_RATE_HEADER);

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?
            .to_vec();

        let info = parse_wav(&audio_data)
            .map_err(|e| TtsError::InvalidResponse(e.to_string()))?;
        let duration_ms = header_duration.or_else(|| Some(info.duration_ms()));
        let sample_rate = header_sample_rate.or(Some(info.format.sample_rate));

        tracing::debug!(
            duration_ms = ?duration_ms,
            sample_rate = ?sample_rate,
            audio_size = audio_data.len(),
            "TTS synthesize completed"
        );

        Ok(InferResponse {
            audio_data,
            duration_ms,
            sample_rate,
        })
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_provider() {
        let config = HttpTtsClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let config = HttpTtsClientConfig::new("http://example.com:9000/").with_timeout(30);
        assert_eq!(config.timeout_secs, 30);

        let client = HttpTtsClient::new(config).unwrap();
        assert_eq!(
            client.synthesize_url(),
            "http://example.com:9000/api/tts/synthesize"
        );
        assert_eq!(client.health_url(), "http://example.com:9000/health");
    }

    #[test]
    fn test_header_value_parsing() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(DURATION_HEADER, "1234".parse().unwrap());
        headers.insert(SAMPLE_RATE_HEADER, "bad".parse().unwrap());

        assert_eq!(header_value::<u64>(&headers, DURATION_HEADER), Some(1234));
        assert_eq!(header_value::<u32>(&headers, SAMPLE_RATE_HEADER), None);
        assert_eq!(header_value::<u32>(&headers, "X-Missing"), None);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        // 端口 9 (discard) 通常无人监听
        let client =
            HttpTtsClient::new(HttpTtsClientConfig::new("http://127.0.0.1:9").with_timeout(2))
                .unwrap();
        let voice = crate::domain::task::VoiceParams::default();
        let result = client.infer(InferRequest::new("你好", &voice, &[])).await;
        assert!(matches!(
            result,
            Err(TtsError::NetworkError(_)) | Err(TtsError::Timeout)
        ));
        assert!(!client.health_check().await);
    }
}
