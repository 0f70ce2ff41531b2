//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现，每个任务一个广播通道

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::application::ports::{JobState, MergeState};
use crate::domain::task::{SentenceId, TaskId};

/// 每个任务通道的缓冲事件数
const CHANNEL_CAPACITY: usize = 256;

/// WebSocket 事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 句子合成任务状态变更
    SynthesisStateChanged {
        task_id: TaskId,
        sentence_id: SentenceId,
        job_id: Uuid,
        generation: u64,
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 合并任务状态变更
    MergeStateChanged {
        task_id: TaskId,
        merge_id: Uuid,
        state: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// 任务已删除
    TaskDeleted { task_id: TaskId },
}

/// 事件发布器
pub struct EventPublisher {
    /// task_id -> broadcast sender
    task_channels: DashMap<TaskId, broadcast::Sender<WsEvent>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            task_channels: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅任务事件（通道不存在时创建）
    pub fn subscribe(&self, task_id: TaskId) -> broadcast::Receiver<WsEvent> {
        self.task_channels
            .entry(task_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// 没有订阅者时移除通道
    pub fn release(&self, task_id: TaskId) {
        self.task_channels
            .remove_if(&task_id, |_, sender| sender.receiver_count() == 0);
    }

    /// 发布合成任务进入运行
    pub fn publish_synthesis_running(
        &self,
        task_id: TaskId,
        sentence_id: SentenceId,
        job_id: Uuid,
        generation: u64,
    ) {
        self.publish(
            task_id,
            WsEvent::SynthesisStateChanged {
                task_id,
                sentence_id,
                job_id,
                generation,
                state: JobState::Running.as_str().to_string(),
                duration_ms: None,
                error: None,
            },
        );
    }

    /// 发布合成成功（带时长）
    pub fn publish_synthesis_succeeded(
        &self,
        task_id: TaskId,
        sentence_id: SentenceId,
        job_id: Uuid,
        generation: u64,
        duration_ms: u64,
    ) {
        self.publish(
            task_id,
            WsEvent::SynthesisStateChanged {
                task_id,
                sentence_id,
                job_id,
                generation,
                state: JobState::Succeeded.as_str().to_string(),
                duration_ms: Some(duration_ms),
                error: None,
            },
        );
    }

    /// 发布合成失败
    pub fn publish_synthesis_failed(
        &self,
        task_id: TaskId,
        sentence_id: SentenceId,
        job_id: Uuid,
        generation: u64,
        error: &str,
    ) {
        self.publish(
            task_id,
            WsEvent::SynthesisStateChanged {
                task_id,
                sentence_id,
                job_id,
                generation,
                state: JobState::Failed.as_str().to_string(),
                duration_ms: None,
                error: Some(error.to_string()),
            },
        );
    }

    /// 发布合并任务状态
    pub fn publish_merge_state(
        &self,
        task_id: TaskId,
        merge_id: Uuid,
        state: MergeState,
        duration_ms: Option<u64>,
        error: Option<&str>,
    ) {
        self.publish(
            task_id,
            WsEvent::MergeStateChanged {
                task_id,
                merge_id,
                state: state.as_str().to_string(),
                duration_ms,
                error: error.map(str::to_string),
            },
        );
    }

    /// 发布任务删除事件并关闭通道
    pub fn publish_task_deleted(&self, task_id: TaskId) {
        self.publish(task_id, WsEvent::TaskDeleted { task_id });
        self.task_channels.remove(&task_id);
    }

    fn publish(&self, task_id: TaskId, event: WsEvent) {
        if let Some(sender) = self.task_channels.get(&task_id) {
            if let Err(e) = sender.send(event) {
                tracing::debug!(
                    task_id = %task_id,
                    error = %e,
                    "Failed to publish event (no receivers)"
                );
            }
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_scoped_per_task() {
        let publisher = EventPublisher::new();
        let task_a = TaskId::new();
        let task_b = TaskId::new();
        let mut rx_a = publisher.subscribe(task_a);
        let mut rx_b = publisher.subscribe(task_b);

        publisher.publish_synthesis_running(task_a, SentenceId::new(), Uuid::new_v4(), 1);

        match rx_a.recv().await.unwrap() {
            WsEvent::SynthesisStateChanged { state, .. } => assert_eq!(state, "running"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_event_serialization_shape() {
        let task_id = TaskId::new();
        let event = WsEvent::MergeStateChanged {
            task_id,
            merge_id: Uuid::nil(),
            state: MergeState::Succeeded.as_str().to_string(),
            duration_ms: Some(1200),
            error: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "MergeStateChanged");
        assert_eq!(json["data"]["state"], "succeeded");
        assert_eq!(json["data"]["duration_ms"], 1200);
        assert!(json["data"].get("error").is_none());
    }

    #[test]
    fn test_release_keeps_channel_with_subscribers() {
        let publisher = EventPublisher::new();
        let task_id = TaskId::new();
        let rx = publisher.subscribe(task_id);

        publisher.release(task_id);
        assert!(publisher.task_channels.contains_key(&task_id));

        drop(rx);
        publisher.release(task_id);
        assert!(!publisher.task_channels.contains_key(&task_id));
    }
}
