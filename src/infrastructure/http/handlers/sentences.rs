//! Sentence Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::{parse_id, unexpected};
use crate::application::commands::{
    DeleteSentence, InsertSentence, RebreakSentence, UpdateSentenceSettings,
};
use crate::application::queries::GetSentence;
use crate::application::{ApplicationError, Operation, Outcome};
use crate::domain::task::{InsertDraft, RebreakSpec, SentenceEdit, SentenceId, SettingsChange};
use crate::domain::BreakingStandard;
use crate::infrastructure::http::dto::{
    ApiResponse, Empty, InsertSentenceRequest, RebreakRequest, RebreakResponse,
    SentenceResponse, SentenceSettingsRequest, SettingsResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub(crate) fn sentence_id(raw: &str) -> Result<SentenceId, ApiError> {
    parse_id(raw, "sentence_id").map(SentenceId::from_uuid)
}

fn settings_change(
    target: SentenceId,
    req: SentenceSettingsRequest,
) -> Result<SettingsChange, ApiError> {
    let rebreak = match req.rebreak {
        Some(r) => Some(RebreakSpec {
            standard: BreakingStandard::from_id(r.breaking_standard_id)
                .map_err(ApplicationError::from)?,
            char_count: r.char_count,
        }),
        None => None,
    };

    Ok(SettingsChange {
        edit: SentenceEdit {
            content: req.content,
            speech_rate: req.speech_rate,
            volume: req.volume,
            pitch: req.pitch,
            voice_id: req.voice_id,
            pauses: req.pauses,
        },
        insertions: req
            .insertions
            .into_iter()
            .map(|ins| InsertDraft {
                parent_id: ins.parent_id.unwrap_or(target),
                content: ins.content,
                voice_id: ins.voice_id,
            })
            .collect(),
        rebreak,
    })
}

pub async fn get_sentence(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<SentenceResponse>>, ApiError> {
    let op = Operation::GetSentence(GetSentence {
        sentence_id: sentence_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Sentence(record) => Ok(Json(ApiResponse::success(record.into()))),
        _ => Err(unexpected("get_sentence")),
    }
}

pub async fn delete_sentence(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let op = Operation::DeleteSentence(DeleteSentence {
        sentence_id: sentence_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Deleted => Ok(Json(ApiResponse::ok())),
        _ => Err(unexpected("delete_sentence")),
    }
}

/// 组合设置：编辑 → 插入 → 重新断句，全部成功或全部不生效
pub async fn update_sentence_settings(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(req): Json<SentenceSettingsRequest>,
) -> Result<Json<ApiResponse<SettingsResponse>>, ApiError> {
    let target = sentence_id(&raw_id)?;
    let op = Operation::UpdateSentenceSettings(UpdateSentenceSettings {
        sentence_id: target,
        change: settings_change(target, req)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Settings(result) => Ok(Json(ApiResponse::success(result.into()))),
        _ => Err(unexpected("update_sentence_settings")),
    }
}

pub async fn insert_sentence(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(req): Json<InsertSentenceRequest>,
) -> Result<Json<ApiResponse<SentenceResponse>>, ApiError> {
    let op = Operation::InsertSentence(InsertSentence {
        parent_id: sentence_id(&raw_id)?,
        content: req.content,
        voice_id: req.voice_id,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Sentence(record) => Ok(Json(ApiResponse::success(record.into()))),
        _ => Err(unexpected("insert_sentence")),
    }
}

pub async fn rebreak_sentence(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Json(req): Json<RebreakRequest>,
) -> Result<Json<ApiResponse<RebreakResponse>>, ApiError> {
    let op = Operation::RebreakSentence(RebreakSentence {
        sentence_id: sentence_id(&raw_id)?,
        standard_id: req.breaking_standard_id,
        char_count: req.char_count,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Rebroken(result) => Ok(Json(ApiResponse::success(result.into()))),
        _ => Err(unexpected("rebreak_sentence")),
    }
}
