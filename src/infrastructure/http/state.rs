//! Application State

use std::sync::Arc;

use crate::application::ports::TtsEnginePort;
use crate::application::TaskOrchestrator;
use crate::infrastructure::events::EventPublisher;

/// 应用状态
///
/// 所有业务操作经由 orchestrator 分发；WebSocket 直接订阅事件发布器
pub struct AppState {
    pub orchestrator: Arc<TaskOrchestrator>,
    pub event_publisher: Arc<EventPublisher>,
    pub tts_engine: Arc<dyn TtsEnginePort>,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<TaskOrchestrator>,
        event_publisher: Arc<EventPublisher>,
        tts_engine: Arc<dyn TtsEnginePort>,
    ) -> Self {
        Self {
            orchestrator,
            event_publisher,
            tts_engine,
        }
    }
}
