//! Merge Handlers

use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::tasks::task_id;
use super::{audio_response, parse_id, unexpected};
use crate::application::commands::MergeSentences;
use crate::application::queries::{GetMerge, GetMergeAudio, ListMerges};
use crate::application::{Operation, Outcome};
use crate::infrastructure::http::dto::{ApiResponse, MergeRequest, MergeResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

fn merge_id(raw: &str) -> Result<Uuid, ApiError> {
    parse_id(raw, "merge_id")
}

/// 按给定顺序合并句子音频（异步）
pub async fn create_merge(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<ApiResponse<MergeResponse>>, ApiError> {
    let op = Operation::Merge(MergeSentences {
        task_id: task_id(&raw_id)?,
        sentence_ids: req.sentence_ids,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Merge(job) => Ok(Json(ApiResponse::success(job.into()))),
        _ => Err(unexpected("merge")),
    }
}

pub async fn list_merges(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MergeResponse>>>, ApiError> {
    let op = Operation::ListMerges(ListMerges {
        task_id: task_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Merges(jobs) => Ok(Json(ApiResponse::success(
            jobs.into_iter().map(MergeResponse::from).collect(),
        ))),
        _ => Err(unexpected("list_merges")),
    }
}

pub async fn get_merge(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<MergeResponse>>, ApiError> {
    let op = Operation::GetMerge(GetMerge {
        merge_id: merge_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Merge(job) => Ok(Json(ApiResponse::success(job.into()))),
        _ => Err(unexpected("get_merge")),
    }
}

/// 合并产物（audio/wav）
pub async fn get_merge_audio(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let op = Operation::GetMergeAudio(GetMergeAudio {
        merge_id: merge_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Audio(blob) => Ok(audio_response(blob)),
        _ => Err(unexpected("get_merge_audio")),
    }
}
