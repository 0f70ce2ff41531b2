//! Task Orchestrator - 操作分发
//!
//! 所有对外操作都是 `Operation` 的一个变体：先做输入校验，再交给负责的 handler。

use std::sync::Arc;

use crate::application::commands::handlers::*;
use crate::application::commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioStorePort, MergeJob, MergeQueuePort, MergeRepositoryPort, Page, PageRequest,
    ReadingRuleRepositoryPort, SentenceRecord, SynthesisJobManagerPort, TaskLockPort,
    TaskRepositoryPort, TaskSummary,
};
use crate::application::queries::handlers::*;
use crate::application::queries::*;
use crate::domain::reading_rule::{ReadingRule, RuleSetting};
use crate::domain::{BreakingStandard, VoiceCatalog, VoiceProfile};

/// 输入限制
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub max_text_chars: usize,
    pub max_page_size: usize,
}

/// 全部对外操作
#[derive(Debug, Clone)]
pub enum Operation {
    CreateTask(CreateTask),
    GetTask(GetTask),
    ListTasks(ListTasks),
    DeleteTask(DeleteTask),

    ListSentences(ListSentences),
    GetSentence(GetSentence),
    DeleteSentence(DeleteSentence),
    UpdateSentenceSettings(UpdateSentenceSettings),
    InsertSentence(InsertSentence),
    RebreakSentence(RebreakSentence),

    CreateReadingRule(CreateReadingRule),
    ListReadingRules(ListReadingRules),
    DeleteReadingRule(DeleteReadingRule),
    ApplyReadingRule(ApplyReadingRule),
    MatchReadingRules(MatchReadingRules),
    SetRuleSetting(SetRuleSetting),

    Synthesize(SynthesizeSentence),
    Resynthesize(ResynthesizeSentence),
    BatchSynthesize(BatchSynthesize),
    GetSentenceSynthesis(GetSentenceSynthesis),
    GetTaskSynthesis(GetTaskSynthesis),
    GetSentenceAudio(GetSentenceAudio),

    Merge(MergeSentences),
    GetMerge(GetMerge),
    ListMerges(ListMerges),
    GetMergeAudio(GetMergeAudio),

    ListBreakingStandards(ListBreakingStandards),
    ListVoices(ListVoices),
}

/// 操作结果
#[derive(Debug, Clone)]
pub enum Outcome {
    Task(TaskSummary),
    Tasks(Page<TaskSummary>),
    Deleted,
    Sentence(SentenceRecord),
    Sentences(Page<SentenceRecord>),
    Settings(SettingsResult),
    Rebroken(RebreakResult),
    Rule(ReadingRule),
    Rules(Vec<RuleEntry>),
    RuleSetting(RuleSetting),
    Applied { modified: usize },
    Matches(Vec<RuleHit>),
    Synthesis(SynthesisView),
    Batch(BatchResult),
    TaskSynthesis(TaskSynthesisView),
    Audio(AudioBlob),
    Merge(MergeJob),
    Merges(Vec<MergeJob>),
    Standards(Vec<StandardInfo>),
    Voices(Vec<VoiceProfile>),
}

fn check_page(page: &PageRequest, limits: &Limits) -> Result<(), ApplicationError> {
    if page.page == 0 {
        return Err(ApplicationError::validation("page 必须从 1 开始"));
    }
    if page.page_size == 0 || page.page_size > limits.max_page_size {
        return Err(ApplicationError::validation(format!(
            "page_size 必须在 1 到 {} 之间",
            limits.max_page_size
        )));
    }
    Ok(())
}

fn check_text(field: &str, text: &str, limits: &Limits) -> Result<(), ApplicationError> {
    if text.trim().is_empty() {
        return Err(ApplicationError::validation(format!("{} 不能为空", field)));
    }
    let len = text.chars().count();
    if len > limits.max_text_chars {
        return Err(ApplicationError::validation(format!(
            "{} 不能超过{}字（当前{}字）",
            field, limits.max_text_chars, len
        )));
    }
    Ok(())
}

fn check_standard(standard_id: u8, char_count: Option<usize>) -> Result<(), ApplicationError> {
    let standard = BreakingStandard::from_id(standard_id)?;
    if char_count == Some(0) {
        return Err(ApplicationError::validation("char_count 必须为正整数"));
    }
    if standard.requires_char_count() && char_count.is_none() {
        return Err(ApplicationError::validation(format!(
            "断句标准「{}」需要 char_count",
            standard.name()
        )));
    }
    Ok(())
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateTask(_) => "create_task",
            Operation::GetTask(_) => "get_task",
            Operation::ListTasks(_) => "list_tasks",
            Operation::DeleteTask(_) => "delete_task",
            Operation::ListSentences(_) => "list_sentences",
            Operation::GetSentence(_) => "get_sentence",
            Operation::DeleteSentence(_) => "delete_sentence",
            Operation::UpdateSentenceSettings(_) => "update_sentence_settings",
            Operation::InsertSentence(_) => "insert_sentence",
            Operation::RebreakSentence(_) => "rebreak_sentence",
            Operation::CreateReadingRule(_) => "create_reading_rule",
            Operation::ListReadingRules(_) => "list_reading_rules",
            Operation::DeleteReadingRule(_) => "delete_reading_rule",
            Operation::ApplyReadingRule(_) => "apply_reading_rule",
            Operation::MatchReadingRules(_) => "match_reading_rules",
            Operation::SetRuleSetting(_) => "set_rule_setting",
            Operation::Synthesize(_) => "synthesize",
            Operation::Resynthesize(_) => "resynthesize",
            Operation::BatchSynthesize(_) => "batch_synthesize",
            Operation::GetSentenceSynthesis(_) => "get_sentence_synthesis",
            Operation::GetTaskSynthesis(_) => "get_task_synthesis",
            Operation::GetSentenceAudio(_) => "get_sentence_audio",
            Operation::Merge(_) => "merge",
            Operation::GetMerge(_) => "get_merge",
            Operation::ListMerges(_) => "list_merges",
            Operation::GetMergeAudio(_) => "get_merge_audio",
            Operation::ListBreakingStandards(_) => "list_breaking_standards",
            Operation::ListVoices(_) => "list_voices",
        }
    }

    /// 分发前的输入校验（不访问存储）
    pub fn validate(&self, limits: &Limits) -> Result<(), ApplicationError> {
        match self {
            Operation::CreateTask(cmd) => {
                check_text("content", &cmd.content, limits)?;
                if let Some(id) = cmd.standard_id {
                    BreakingStandard::from_id(id)?;
                }
                if cmd.char_count == Some(0) {
                    return Err(ApplicationError::validation("char_count 必须为正整数"));
                }
                Ok(())
            }
            Operation::ListTasks(q) => check_page(&q.page, limits),
            Operation::ListSentences(q) => check_page(&q.page, limits),
            Operation::InsertSentence(cmd) => check_text("content", &cmd.content, limits),
            Operation::RebreakSentence(cmd) => check_standard(cmd.standard_id, cmd.char_count),
            Operation::UpdateSentenceSettings(cmd) => {
                if let Some(content) = cmd.change.edit.content.as_set() {
                    check_text("content", content, limits)?;
                }
                for draft in &cmd.change.insertions {
                    check_text("content", &draft.content, limits)?;
                }
                if let Some(spec) = &cmd.change.rebreak {
                    check_standard(spec.standard.id(), spec.char_count)?;
                }
                Ok(())
            }
            Operation::CreateReadingRule(cmd) => {
                if cmd.pattern.trim().is_empty() {
                    return Err(ApplicationError::validation("pattern 不能为空"));
                }
                Ok(())
            }
            Operation::MatchReadingRules(q) => check_text("text", &q.text, limits),
            Operation::Merge(cmd) => {
                if cmd.sentence_ids.is_empty() {
                    return Err(ApplicationError::validation("sentence_ids 不能为空"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// 编排器依赖
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub task_repo: Arc<dyn TaskRepositoryPort>,
    pub rule_repo: Arc<dyn ReadingRuleRepositoryPort>,
    pub merge_repo: Arc<dyn MergeRepositoryPort>,
    pub audio_store: Arc<dyn AudioStorePort>,
    pub jobs: Arc<dyn SynthesisJobManagerPort>,
    pub locks: Arc<dyn TaskLockPort>,
    pub merge_queue: Arc<dyn MergeQueuePort>,
    pub defaults: TaskDefaults,
    pub limits: Limits,
    pub voices: Arc<VoiceCatalog>,
}

/// Task Orchestrator
pub struct TaskOrchestrator {
    limits: Limits,

    create_task: CreateTaskHandler,
    get_task: GetTaskHandler,
    list_tasks: ListTasksHandler,
    delete_task: DeleteTaskHandler,

    list_sentences: ListSentencesHandler,
    get_sentence: GetSentenceHandler,
    delete_sentence: DeleteSentenceHandler,
    update_settings: UpdateSentenceSettingsHandler,
    insert_sentence: InsertSentenceHandler,
    rebreak_sentence: RebreakSentenceHandler,

    create_rule: CreateReadingRuleHandler,
    list_rules: ListReadingRulesHandler,
    delete_rule: DeleteReadingRuleHandler,
    apply_rule: ApplyReadingRuleHandler,
    match_rules: MatchReadingRulesHandler,
    set_rule_setting: SetRuleSettingHandler,

    synthesize: SynthesizeSentenceHandler,
    resynthesize: ResynthesizeSentenceHandler,
    batch_synthesize: BatchSynthesizeHandler,
    sentence_synthesis: GetSentenceSynthesisHandler,
    task_synthesis: GetTaskSynthesisHandler,
    sentence_audio: GetSentenceAudioHandler,

    merge: MergeSentencesHandler,
    get_merge: GetMergeHandler,
    list_merges: ListMergesHandler,
    merge_audio: GetMergeAudioHandler,

    standards: ListBreakingStandardsHandler,
    voices: ListVoicesHandler,
}

impl TaskOrchestrator {
    pub fn new(deps: OrchestratorDeps) -> Self {
        let sentence_deps = SentenceDeps {
            task_repo: deps.task_repo.clone(),
            merge_repo: deps.merge_repo.clone(),
            audio_store: deps.audio_store.clone(),
            jobs: deps.jobs.clone(),
            locks: deps.locks.clone(),
            max_text_chars: deps.limits.max_text_chars,
        };
        let scheduler = SynthesisScheduler::new(
            deps.task_repo.clone(),
            deps.jobs.clone(),
            deps.locks.clone(),
            deps.limits.max_text_chars,
        );

        Self {
            limits: deps.limits,

            create_task: CreateTaskHandler::new(deps.task_repo.clone(), deps.defaults),
            get_task: GetTaskHandler::new(deps.task_repo.clone()),
            list_tasks: ListTasksHandler::new(deps.task_repo.clone()),
            delete_task: DeleteTaskHandler::new(
                deps.task_repo.clone(),
                deps.merge_repo.clone(),
                deps.audio_store.clone(),
                deps.jobs.clone(),
                deps.locks.clone(),
            ),

            list_sentences: ListSentencesHandler::new(deps.task_repo.clone()),
            get_sentence: GetSentenceHandler::new(deps.task_repo.clone()),
            delete_sentence: DeleteSentenceHandler::new(sentence_deps.clone()),
            update_settings: UpdateSentenceSettingsHandler::new(sentence_deps.clone()),
            insert_sentence: InsertSentenceHandler::new(sentence_deps.clone()),
            rebreak_sentence: RebreakSentenceHandler::new(sentence_deps),

            create_rule: CreateReadingRuleHandler::new(
                deps.rule_repo.clone(),
                deps.task_repo.clone(),
            ),
            list_rules: ListReadingRulesHandler::new(deps.rule_repo.clone()),
            delete_rule: DeleteReadingRuleHandler::new(deps.rule_repo.clone()),
            apply_rule: ApplyReadingRuleHandler::new(
                deps.rule_repo.clone(),
                deps.task_repo.clone(),
                deps.locks.clone(),
            ),
            match_rules: MatchReadingRulesHandler::new(deps.rule_repo.clone()),
            set_rule_setting: SetRuleSettingHandler::new(
                deps.rule_repo.clone(),
                deps.task_repo.clone(),
                deps.locks.clone(),
            ),

            synthesize: SynthesizeSentenceHandler::new(scheduler.clone()),
            resynthesize: ResynthesizeSentenceHandler::new(scheduler.clone()),
            batch_synthesize: BatchSynthesizeHandler::new(scheduler, deps.jobs.clone()),
            sentence_synthesis: GetSentenceSynthesisHandler::new(
                deps.task_repo.clone(),
                deps.jobs.clone(),
            ),
            task_synthesis: GetTaskSynthesisHandler::new(deps.task_repo.clone(), deps.jobs.clone()),
            sentence_audio: GetSentenceAudioHandler::new(
                deps.task_repo.clone(),
                deps.audio_store.clone(),
            ),

            merge: MergeSentencesHandler::new(
                deps.task_repo.clone(),
                deps.merge_repo.clone(),
                deps.merge_queue.clone(),
                deps.locks.clone(),
            ),
            get_merge: GetMergeHandler::new(deps.merge_repo.clone()),
            list_merges: ListMergesHandler::new(deps.merge_repo.clone(), deps.task_repo.clone()),
            merge_audio: GetMergeAudioHandler::new(deps.merge_repo, deps.audio_store),

            standards: ListBreakingStandardsHandler,
            voices: ListVoicesHandler::new(deps.voices),
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// 校验并执行操作
    pub async fn dispatch(&self, op: Operation) -> Result<Outcome, ApplicationError> {
        let name = op.name();
        op.validate(&self.limits)?;
        tracing::debug!(operation = name, "Dispatching operation");

        let outcome = match op {
            Operation::CreateTask(cmd) => Outcome::Task(self.create_task.handle(cmd).await?),
            Operation::GetTask(q) => Outcome::Task(self.get_task.handle(q).await?),
            Operation::ListTasks(q) => Outcome::Tasks(self.list_tasks.handle(q).await?),
            Operation::DeleteTask(cmd) => {
                self.delete_task.handle(cmd).await?;
                Outcome::Deleted
            }

            Operation::ListSentences(q) => Outcome::Sentences(self.list_sentences.handle(q).await?),
            Operation::GetSentence(q) => Outcome::Sentence(self.get_sentence.handle(q).await?),
            Operation::DeleteSentence(cmd) => {
                self.delete_sentence.handle(cmd).await?;
                Outcome::Deleted
            }
            Operation::UpdateSentenceSettings(cmd) => {
                Outcome::Settings(self.update_settings.handle(cmd).await?)
            }
            Operation::InsertSentence(cmd) => {
                Outcome::Sentence(self.insert_sentence.handle(cmd).await?)
            }
            Operation::RebreakSentence(cmd) => {
                Outcome::Rebroken(self.rebreak_sentence.handle(cmd).await?)
            }

            Operation::CreateReadingRule(cmd) => Outcome::Rule(self.create_rule.handle(cmd).await?),
            Operation::ListReadingRules(q) => Outcome::Rules(self.list_rules.handle(q).await?),
            Operation::DeleteReadingRule(cmd) => {
                self.delete_rule.handle(cmd).await?;
                Outcome::Deleted
            }
            Operation::ApplyReadingRule(cmd) => Outcome::Applied {
                modified: self.apply_rule.handle(cmd).await?,
            },
            Operation::MatchReadingRules(q) => Outcome::Matches(self.match_rules.handle(q).await?),
            Operation::SetRuleSetting(cmd) => {
                Outcome::RuleSetting(self.set_rule_setting.handle(cmd).await?)
            }

            Operation::Synthesize(cmd) => Outcome::Synthesis(self.synthesize.handle(cmd).await?),
            Operation::Resynthesize(cmd) => {
                Outcome::Synthesis(self.resynthesize.handle(cmd).await?)
            }
            Operation::BatchSynthesize(cmd) => {
                Outcome::Batch(self.batch_synthesize.handle(cmd).await?)
            }
            Operation::GetSentenceSynthesis(q) => {
                Outcome::Synthesis(self.sentence_synthesis.handle(q).await?)
            }
            Operation::GetTaskSynthesis(q) => {
                Outcome::TaskSynthesis(self.task_synthesis.handle(q).await?)
            }
            Operation::GetSentenceAudio(q) => Outcome::Audio(self.sentence_audio.handle(q).await?),

            Operation::Merge(cmd) => Outcome::Merge(self.merge.handle(cmd).await?),
            Operation::GetMerge(q) => Outcome::Merge(self.get_merge.handle(q).await?),
            Operation::ListMerges(q) => Outcome::Merges(self.list_merges.handle(q).await?),
            Operation::GetMergeAudio(q) => Outcome::Audio(self.merge_audio.handle(q).await?),

            Operation::ListBreakingStandards(q) => Outcome::Standards(self.standards.handle(q)),
            Operation::ListVoices(q) => Outcome::Voices(self.voices.handle(q)),
        };

        Ok(outcome)
    }
}
