//! WebSocket Handler - 任务级进度推送

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::tasks::task_id;
use crate::application::queries::GetTask;
use crate::application::Operation;
use crate::domain::task::TaskId;
use crate::infrastructure::events::WsEvent;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 任务 WebSocket 连接（合成与合并状态事件）
pub async fn task_websocket_handler(
    ws: WebSocketUpgrade,
    Path(raw_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let task_id = task_id(&raw_id)?;

    // 任务不存在时不升级连接
    state
        .orchestrator
        .dispatch(Operation::GetTask(GetTask { task_id }))
        .await?;

    Ok(ws
        .on_upgrade(move |socket| handle_task_socket(socket, task_id, state))
        .into_response())
}

async fn handle_task_socket(socket: WebSocket, task_id: TaskId, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut event_rx = state.event_publisher.subscribe(task_id);

    tracing::info!(task_id = %task_id, "WebSocket connected");

    // 事件转发任务
    let mut forward_task = tokio::spawn(async move {
        loop {
            let event = match event_rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        task_id = %task_id,
                        skipped = skipped,
                        "WebSocket subscriber lagged"
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let last = matches!(event, WsEvent::TaskDeleted { .. });
            let msg = match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event");
                    continue;
                }
            };

            if let Err(e) = sender.send(msg).await {
                tracing::debug!(task_id = %task_id, error = %e, "Failed to send WebSocket message");
                break;
            }

            if last {
                let _ = sender.close().await;
                break;
            }
        }
    });

    // 接收客户端消息（心跳由 axum 自动响应）
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!(task_id = %task_id, "WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(task_id = %task_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
    });

    // 任一方向结束即关闭连接；等待另一侧退出后订阅才会真正释放
    tokio::select! {
        _ = &mut forward_task => {
            receive_task.abort();
            let _ = receive_task.await;
        }
        _ = &mut receive_task => {
            forward_task.abort();
            let _ = forward_task.await;
        }
    }

    state.event_publisher.release(task_id);
    tracing::info!(task_id = %task_id, "WebSocket disconnected");
}
