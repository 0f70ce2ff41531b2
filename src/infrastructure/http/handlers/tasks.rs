//! Task Handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use super::{parse_id, unexpected};
use crate::application::commands::{CreateTask, DeleteTask};
use crate::application::ports::PageRequest;
use crate::application::queries::{GetTask, ListBreakingStandards, ListSentences, ListTasks};
use crate::application::{Operation, Outcome};
use crate::domain::task::TaskId;
use crate::infrastructure::http::dto::{
    ApiResponse, CreateTaskRequest, Empty, PageQuery, PageResponse, SentenceResponse,
    StandardResponse, TaskResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

pub(crate) fn task_id(raw: &str) -> Result<TaskId, ApiError> {
    parse_id(raw, "task_id").map(TaskId::from_uuid)
}

/// 断句标准目录
pub async fn list_breaking_standards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<StandardResponse>>>, ApiError> {
    match state
        .orchestrator
        .dispatch(Operation::ListBreakingStandards(ListBreakingStandards))
        .await?
    {
        Outcome::Standards(items) => Ok(Json(ApiResponse::success(
            items.into_iter().map(StandardResponse::from).collect(),
        ))),
        _ => Err(unexpected("list_breaking_standards")),
    }
}

/// 创建任务并同步完成断句
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<ApiResponse<TaskResponse>>, ApiError> {
    let op = Operation::CreateTask(CreateTask {
        content: req.content,
        standard_id: req.breaking_standard_id,
        char_count: req.char_count,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Task(summary) => Ok(Json(ApiResponse::success(summary.into()))),
        _ => Err(unexpected("create_task")),
    }
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<TaskResponse>>>, ApiError> {
    let op = Operation::ListTasks(ListTasks {
        page: PageRequest::new(query.page, query.page_size),
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Tasks(page) => Ok(Json(ApiResponse::success(PageResponse::from_page(
            page,
            TaskResponse::from,
        )))),
        _ => Err(unexpected("list_tasks")),
    }
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<TaskResponse>>, ApiError> {
    let op = Operation::GetTask(GetTask {
        task_id: task_id(&raw_id)?,
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Task(summary) => Ok(Json(ApiResponse::success(summary.into()))),
        _ => Err(unexpected("get_task")),
    }
}

/// 删除任务，并通知该任务的 WebSocket 订阅者
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    let task_id = task_id(&raw_id)?;

    match state
        .orchestrator
        .dispatch(Operation::DeleteTask(DeleteTask { task_id }))
        .await?
    {
        Outcome::Deleted => {
            state.event_publisher.publish_task_deleted(task_id);
            Ok(Json(ApiResponse::ok()))
        }
        _ => Err(unexpected("delete_task")),
    }
}

pub async fn list_sentences(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<PageResponse<SentenceResponse>>>, ApiError> {
    let op = Operation::ListSentences(ListSentences {
        task_id: task_id(&raw_id)?,
        page: PageRequest::new(query.page, query.page_size),
    });

    match state.orchestrator.dispatch(op).await? {
        Outcome::Sentences(page) => Ok(Json(ApiResponse::success(PageResponse::from_page(
            page,
            SentenceResponse::from,
        )))),
        _ => Err(unexpected("list_sentences")),
    }
}
