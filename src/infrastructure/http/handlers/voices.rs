//! Voice Handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use super::unexpected;
use crate::application::queries::ListVoices;
use crate::application::{Operation, Outcome};
use crate::infrastructure::http::dto::{ApiResponse, ListVoicesQuery, VoiceResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 音色目录，按 sort_order 排列
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListVoicesQuery>,
) -> Result<Json<ApiResponse<Vec<VoiceResponse>>>, ApiError> {
    let op = Operation::ListVoices(ListVoices {
        recommended: query.recommended,
        language: query.language,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Voices(voices) => Ok(Json(ApiResponse::success(
            voices.into_iter().map(VoiceResponse::from).collect(),
        ))),
        _ => Err(unexpected("list_voices")),
    }
}
