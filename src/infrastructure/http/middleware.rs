//! HTTP Middleware
//!
//! 请求体解析失败等框架层拒绝统一改写为信封响应

use axum::{
    body::to_bytes,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use super::error::{code, ErrorResponse};

/// 读取拒绝原因时最多读取的字节数
const REJECTION_BODY_LIMIT: usize = 4096;

/// 提取器拒绝（JSON 格式错误、缺少字段、Content-Type 不对、请求体过大等）
fn is_extractor_rejection(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::PAYLOAD_TOO_LARGE
            | StatusCode::UNSUPPORTED_MEDIA_TYPE
            | StatusCode::UNPROCESSABLE_ENTITY
    )
}

async fn rejection_message(response: Response) -> String {
    match to_bytes(response.into_body(), REJECTION_BODY_LIMIT).await {
        Ok(bytes) if !bytes.is_empty() => String::from_utf8_lossy(&bytes).into_owned(),
        _ => "请求格式错误".to_string(),
    }
}

/// 错误日志与拒绝改写中间件
///
/// - `/api` 下的提取器拒绝改写为 HTTP 200 + `10400` 信封
/// - 其余 4xx/5xx 原样返回并记录日志（WebSocket 升级失败、未知路由等）
///
/// 业务错误在 `ApiError::into_response()` 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP server error"
        );
        return response;
    }

    if !status.is_client_error() {
        return response;
    }

    if uri.path().starts_with("/api/") && is_extractor_rejection(status) {
        let message = rejection_message(response).await;
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            error = %message,
            "Request rejected"
        );
        return (
            StatusCode::OK,
            Json(ErrorResponse::new(code::VALIDATION, message)),
        )
            .into_response();
    }

    tracing::warn!(
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        "HTTP client error"
    );
    response
}
