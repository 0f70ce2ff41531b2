//! Synthesis Handlers
//!
//! 提交接口立即返回任务快照，进度通过轮询或 WebSocket 获取

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use std::sync::Arc;

use super::sentences::sentence_id;
use super::tasks::task_id;
use super::{audio_response, unexpected};
use crate::application::commands::{BatchSynthesize, ResynthesizeSentence, SynthesizeSentence};
use crate::application::queries::{GetSentenceAudio, GetSentenceSynthesis, GetTaskSynthesis};
use crate::application::{Operation, Outcome};
use crate::infrastructure::http::dto::{
    ApiResponse, BatchSynthesisResponse, BatchSynthesizeRequest, SynthesisResponse,
    SynthesizeRequest, TaskSynthesisResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 合成单个句子；已有排队/运行中的任务时直接返回该任务
pub async fn synthesize_sentence(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Option<Json<SynthesizeRequest>>,
) -> Result<Json<ApiResponse<SynthesisResponse>>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let op = Operation::Synthesize(SynthesizeSentence {
        sentence_id: sentence_id(&raw_id)?,
        voice: req.into(),
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Synthesis(view) => Ok(Json(ApiResponse::success(view.into()))),
        _ => Err(unexpected("synthesize")),
    }
}

/// 重新合成：总是创建新一代任务
pub async fn resynthesize_sentence(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Option<Json<SynthesizeRequest>>,
) -> Result<Json<ApiResponse<SynthesisResponse>>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let op = Operation::Resynthesize(ResynthesizeSentence {
        sentence_id: sentence_id(&raw_id)?,
        voice: req.into(),
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Synthesis(view) => Ok(Json(ApiResponse::success(view.into()))),
        _ => Err(unexpected("resynthesize")),
    }
}

pub async fn batch_synthesize(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    body: Option<Json<BatchSynthesizeRequest>>,
) -> Result<Json<ApiResponse<BatchSynthesisResponse>>, ApiError> {
    let (sentence_ids, voice) = body
        .map(|Json(req)| req)
        .unwrap_or_default()
        .into_parts();
    let op = Operation::BatchSynthesize(BatchSynthesize {
        task_id: task_id(&raw_id)?,
        sentence_ids,
        voice,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Batch(result) => Ok(Json(ApiResponse::success(BatchSynthesisResponse {
            task_id: result.task_id,
            jobs: result.jobs.into_iter().map(SynthesisResponse::from).collect(),
        }))),
        _ => Err(unexpected("batch_synthesize")),
    }
}

pub async fn get_sentence_synthesis(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<SynthesisResponse>>, ApiError> {
    let op = Operation::GetSentenceSynthesis(GetSentenceSynthesis {
        sentence_id: sentence_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Synthesis(view) => Ok(Json(ApiResponse::success(view.into()))),
        _ => Err(unexpected("get_sentence_synthesis")),
    }
}

pub async fn get_task_synthesis(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<TaskSynthesisResponse>>, ApiError> {
    let op = Operation::GetTaskSynthesis(GetTaskSynthesis {
        task_id: task_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::TaskSynthesis(view) => Ok(Json(ApiResponse::success(view.into()))),
        _ => Err(unexpected("get_task_synthesis")),
    }
}

/// 句子最近一次成功合成的音频（audio/wav）
pub async fn get_sentence_audio(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let op = Operation::GetSentenceAudio(GetSentenceAudio {
        sentence_id: sentence_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Audio(blob) => Ok(audio_response(blob)),
        _ => Err(unexpected("get_sentence_audio")),
    }
}
