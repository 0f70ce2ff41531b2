//! Runtime - 组装仓储、任务表、Worker 与编排器

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::commands::handlers::TaskDefaults;
use crate::application::ports::{
    AudioMergerPort, AudioStorePort, MergeRepositoryPort, RepositoryError, TaskRepositoryPort,
    TtsEnginePort, MAX_PAGE_SIZE,
};
use crate::application::{Limits, OrchestratorDeps, TaskOrchestrator};
use crate::config::{AppConfig, ConfigError};
use crate::domain::{BreakingStandard, VoiceCatalog};
use crate::infrastructure::events::EventPublisher;
use crate::infrastructure::http::AppState;
use crate::infrastructure::memory::{
    ChannelMergeQueue, InMemorySynthesisJobManager, InMemoryTaskLocks,
};
use crate::infrastructure::persistence::sqlite::{
    DbPool, SqliteMergeRepository, SqliteReadingRuleRepository, SqliteTaskRepository,
};
use crate::infrastructure::worker::{
    MergeWorker, MergeWorkerConfig, SynthesisWorker, SynthesisWorkerConfig,
};

/// 重启时遗留的运行中任务统一标记的失败原因
const INTERRUPTED_REASON: &str = "interrupted by restart";

/// 运行参数
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub synthesis_concurrency: usize,
    pub merge_concurrency: usize,
    pub queue_capacity: usize,
    pub provider_timeout: Duration,
    pub defaults: TaskDefaults,
    pub limits: Limits,
    pub voices: VoiceCatalog,
}

impl RuntimeOptions {
    /// 从已校验的配置构建
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let standard = BreakingStandard::from_id(config.segmenter.default_standard)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        let voices = VoiceCatalog::new(config.voices.catalog.clone()).map_err(|id| {
            ConfigError::ValidationError(format!("blank or duplicate voice_id '{}'", id))
        })?;
        Ok(Self {
            synthesis_concurrency: config.worker.synthesis_concurrency,
            merge_concurrency: config.worker.merge_concurrency,
            queue_capacity: config.worker.queue_capacity,
            provider_timeout: Duration::from_secs(config.tts.timeout_secs),
            defaults: TaskDefaults {
                standard,
                char_count: config.segmenter.default_char_count,
                max_text_chars: config.segmenter.max_text_chars,
            },
            limits: Limits {
                max_text_chars: config.segmenter.max_text_chars,
                max_page_size: MAX_PAGE_SIZE,
            },
            voices,
        })
    }
}

/// 已启动的运行时
///
/// Worker 持有队列接收端，随 tokio runtime 一起结束
pub struct Runtime {
    pub orchestrator: Arc<TaskOrchestrator>,
    pub event_publisher: Arc<EventPublisher>,
    pub tts_engine: Arc<dyn TtsEnginePort>,
}

impl Runtime {
    /// 组装并启动后台 Worker
    ///
    /// 先把上次运行遗留的排队/运行中合成与合并标记为失败，再接受新请求
    pub async fn start(
        pool: DbPool,
        audio_store: Arc<dyn AudioStorePort>,
        tts_engine: Arc<dyn TtsEnginePort>,
        merger: Arc<dyn AudioMergerPort>,
        options: RuntimeOptions,
    ) -> Result<Self, RepositoryError> {
        let task_repo: Arc<dyn TaskRepositoryPort> =
            Arc::new(SqliteTaskRepository::new(pool.clone()));
        let rule_repo = Arc::new(SqliteReadingRuleRepository::new(pool.clone()));
        let merge_repo: Arc<dyn MergeRepositoryPort> = Arc::new(SqliteMergeRepository::new(pool));

        let interrupted = task_repo.fail_active_synthesis(INTERRUPTED_REASON).await?;
        let interrupted_merges = merge_repo.fail_active(INTERRUPTED_REASON).await?;
        if interrupted > 0 || interrupted_merges > 0 {
            tracing::warn!(
                sentences = interrupted,
                merges = interrupted_merges,
                "Marked interrupted jobs as failed"
            );
        }

        let event_publisher = EventPublisher::new().arc();
        let locks = Arc::new(InMemoryTaskLocks::new());

        let (synthesis_tx, synthesis_rx) = mpsc::channel(options.queue_capacity);
        let (merge_tx, merge_rx) = mpsc::channel(options.queue_capacity);

        let jobs = InMemorySynthesisJobManager::new(synthesis_tx).arc();
        let merge_queue = Arc::new(ChannelMergeQueue::new(merge_tx));

        let synthesis_worker = SynthesisWorker::new(
            SynthesisWorkerConfig {
                max_concurrent: options.synthesis_concurrency,
                provider_timeout: options.provider_timeout,
            },
            synthesis_rx,
            jobs.clone(),
            task_repo.clone(),
            locks.clone(),
            tts_engine.clone(),
            audio_store.clone(),
            event_publisher.clone(),
        );
        let merge_worker = MergeWorker::new(
            MergeWorkerConfig {
                max_concurrent: options.merge_concurrency,
            },
            merge_rx,
            merge_repo.clone(),
            task_repo.clone(),
            locks.clone(),
            audio_store.clone(),
            merger,
            event_publisher.clone(),
        );

        tokio::spawn(synthesis_worker.run());
        tokio::spawn(merge_worker.run());

        let orchestrator = Arc::new(TaskOrchestrator::new(OrchestratorDeps {
            task_repo,
            rule_repo,
            merge_repo,
            audio_store,
            jobs,
            locks,
            merge_queue,
            defaults: options.defaults,
            limits: options.limits,
            voices: Arc::new(options.voices),
        }));

        Ok(Self {
            orchestrator,
            event_publisher,
            tts_engine,
        })
    }

    /// HTTP 层共享状态
    pub fn app_state(&self) -> AppState {
        AppState::new(
            self.orchestrator.clone(),
            self.event_publisher.clone(),
            self.tts_engine.clone(),
        )
    }
}
