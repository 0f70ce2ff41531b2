//! 测试用运行时：内存 SQLite + 临时目录 sled + FakeTtsClient

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use uuid::Uuid;

use crate::application::commands::handlers::TaskDefaults;
use crate::application::commands::{CreateTask, MergeSentences};
use crate::application::ports::{
    AudioMergerPort, MergeJob, MergeState, PageRequest, SentenceRecord, TaskSummary, MAX_PAGE_SIZE,
};
use crate::application::queries::handlers::SynthesisView;
use crate::application::queries::{GetMerge, GetSentenceSynthesis, ListSentences};
use crate::application::{Limits, Operation, Outcome, TaskOrchestrator};
use crate::config::AppConfig;
use crate::domain::task::{SentenceId, SynthesisStatus, TaskId};
use crate::domain::BreakingStandard;
use crate::infrastructure::adapters::{FakeTtsClient, FakeTtsClientConfig, WavMerger};
use crate::infrastructure::http::AppState;
use crate::infrastructure::persistence::sled::SledAudioStore;
use crate::infrastructure::persistence::sqlite::{create_pool, run_migrations, DatabaseConfig};
use crate::infrastructure::runtime::{Runtime, RuntimeOptions};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) struct Harness {
    pub runtime: Runtime,
    pub tts: Arc<FakeTtsClient>,
    _dir: TempDir,
}

pub(crate) fn test_options() -> RuntimeOptions {
    RuntimeOptions {
        synthesis_concurrency: 4,
        merge_concurrency: 2,
        queue_capacity: 64,
        provider_timeout: Duration::from_secs(5),
        defaults: TaskDefaults {
            standard: BreakingStandard::Punctuation,
            char_count: 50,
            max_text_chars: 10_000,
        },
        limits: Limits {
            max_text_chars: 10_000,
            max_page_size: MAX_PAGE_SIZE,
        },
        voices: RuntimeOptions::from_config(&AppConfig::default())
            .map(|options| options.voices)
            .unwrap(),
    }
}

pub(crate) async fn harness() -> Harness {
    harness_with(FakeTtsClientConfig::default()).await
}

pub(crate) async fn harness_with(tts_config: FakeTtsClientConfig) -> Harness {
    harness_with_options(tts_config, test_options()).await
}

pub(crate) async fn harness_with_options(
    tts_config: FakeTtsClientConfig,
    options: RuntimeOptions,
) -> Harness {
    build_harness(tts_config, options, Arc::new(WavMerger::new())).await
}

pub(crate) async fn harness_with_merger(merger: Arc<dyn AudioMergerPort>) -> Harness {
    build_harness(FakeTtsClientConfig::default(), test_options(), merger).await
}

async fn build_harness(
    tts_config: FakeTtsClientConfig,
    options: RuntimeOptions,
    merger: Arc<dyn AudioMergerPort>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();

    let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let store = SledAudioStore::open(dir.path().join("store.sled"), 0)
        .unwrap()
        .arc();
    let tts = Arc::new(FakeTtsClient::new(tts_config));

    let runtime = Runtime::start(pool, store, tts.clone(), merger, options)
        .await
        .unwrap();

    Harness {
        runtime,
        tts,
        _dir: dir,
    }
}

impl Harness {
    pub fn orchestrator(&self) -> &TaskOrchestrator {
        &self.runtime.orchestrator
    }

    pub fn app_state(&self) -> AppState {
        self.runtime.app_state()
    }

    pub async fn create_task(&self, content: &str) -> TaskSummary {
        let op = Operation::CreateTask(CreateTask {
            content: content.to_string(),
            standard_id: None,
            char_count: None,
        });
        match self.orchestrator().dispatch(op).await.unwrap() {
            Outcome::Task(summary) => summary,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    pub async fn sentences(&self, task_id: TaskId) -> Vec<SentenceRecord> {
        let op = Operation::ListSentences(ListSentences {
            task_id,
            page: PageRequest::new(Some(1), Some(MAX_PAGE_SIZE)),
        });
        match self.orchestrator().dispatch(op).await.unwrap() {
            Outcome::Sentences(page) => page.items,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    pub async fn synthesis(&self, sentence_id: SentenceId) -> SynthesisView {
        let op = Operation::GetSentenceSynthesis(GetSentenceSynthesis { sentence_id });
        match self.orchestrator().dispatch(op).await.unwrap() {
            Outcome::Synthesis(view) => view,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    /// 轮询直到句子的当前合成任务结束
    pub async fn wait_synthesis(&self, sentence_id: SentenceId) -> SynthesisView {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let view = self.synthesis(sentence_id).await;
            if matches!(
                view.status,
                SynthesisStatus::Succeeded | SynthesisStatus::Failed
            ) {
                return view;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "synthesis did not finish: {:?}",
                view
            );
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn merge(&self, task_id: TaskId, sentence_ids: Vec<SentenceId>) -> MergeJob {
        let op = Operation::Merge(MergeSentences {
            task_id,
            sentence_ids,
        });
        match self.orchestrator().dispatch(op).await.unwrap() {
            Outcome::Merge(job) => job,
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    /// 轮询直到合并任务结束
    pub async fn wait_merge(&self, merge_id: Uuid) -> MergeJob {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let op = Operation::GetMerge(GetMerge { merge_id });
            let job = match self.orchestrator().dispatch(op).await.unwrap() {
                Outcome::Merge(job) => job,
                other => panic!("unexpected outcome: {:?}", other),
            };
            if matches!(job.state, MergeState::Succeeded | MergeState::Failed) {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "merge did not finish: {:?}",
                job
            );
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
