//! HTTP Handlers
//!
//! 每个 handler 只做请求解析与响应转换，业务统一交给 `TaskOrchestrator::dispatch`

mod merges;
mod ping;
mod reading_rules;
mod sentences;
mod synthesis;
mod tasks;
mod voices;
mod websocket;

pub use merges::*;
pub use ping::*;
pub use reading_rules::*;
pub use sentences::*;
pub use synthesis::*;
pub use tasks::*;
pub use voices::*;
pub use websocket::*;

use axum::{
    http::header::{HeaderName, HeaderValue, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::application::queries::handlers::AudioBlob;
use crate::infrastructure::http::error::ApiError;

const AUDIO_DURATION_HEADER: &str = "x-audio-duration-ms";

/// 解析路径中的 UUID，失败时返回信封格式的校验错误
pub(crate) fn parse_id(raw: &str, name: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::BadRequest(format!("{} 不是合法的 UUID: {}", name, raw)))
}

/// dispatch 返回了与操作不匹配的结果
pub(crate) fn unexpected(operation: &str) -> ApiError {
    ApiError::Internal(format!("unexpected outcome for {}", operation))
}

/// WAV 音频响应
pub(crate) fn audio_response(blob: AudioBlob) -> Response {
    (
        [
            (CONTENT_TYPE, HeaderValue::from_static("audio/wav")),
            (
                HeaderName::from_static(AUDIO_DURATION_HEADER),
                HeaderValue::from(blob.duration_ms),
            ),
        ],
        blob.data,
    )
        .into_response()
}
