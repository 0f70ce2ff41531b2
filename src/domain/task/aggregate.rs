//! Task Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_pauses, Patch, Pause, Sentence, SentenceId, TaskError, TaskId, VoiceParams};
use crate::domain::text_segmenter::{segment, BreakingStandard, SegmentParams};

/// 任务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
    Segmenting,
    Ready,
    Synthesizing,
    Merged,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "created",
            TaskStatus::Segmenting => "segmenting",
            TaskStatus::Ready => "ready",
            TaskStatus::Synthesizing => "synthesizing",
            TaskStatus::Merged => "merged",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(TaskStatus::Created),
            "segmenting" => Some(TaskStatus::Segmenting),
            "ready" => Some(TaskStatus::Ready),
            "synthesizing" => Some(TaskStatus::Synthesizing),
            "merged" => Some(TaskStatus::Merged),
            _ => None,
        }
    }

    /// 断句完成后句子才可编辑
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            TaskStatus::Ready | TaskStatus::Synthesizing | TaskStatus::Merged
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 句子参数编辑（仅提供的字段生效）
#[derive(Debug, Clone, Default)]
pub struct SentenceEdit {
    pub content: Patch<String>,
    pub speech_rate: Patch<i32>,
    pub volume: Patch<i32>,
    pub pitch: Patch<i32>,
    pub voice_id: Patch<Option<String>>,
    pub pauses: Patch<Vec<Pause>>,
}

impl SentenceEdit {
    pub fn is_empty(&self) -> bool {
        !(self.content.is_set()
            || self.speech_rate.is_set()
            || self.volume.is_set()
            || self.pitch.is_set()
            || self.voice_id.is_set()
            || self.pauses.is_set())
    }
}

/// 在指定句子下方插入
#[derive(Debug, Clone)]
pub struct InsertDraft {
    pub parent_id: SentenceId,
    pub content: String,
    /// None 时沿用父句的音色
    pub voice_id: Option<String>,
}

/// 重新断句参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebreakSpec {
    pub standard: BreakingStandard,
    pub char_count: Option<usize>,
}

/// 组合设置：编辑 → 插入 → 重新断句
#[derive(Debug, Clone, Default)]
pub struct SettingsChange {
    pub edit: SentenceEdit,
    pub insertions: Vec<InsertDraft>,
    pub rebreak: Option<RebreakSpec>,
}

/// 重新断句结果
#[derive(Debug, Clone)]
pub struct RebreakOutcome {
    /// 被替换掉的原句；幂等无变化时为 None
    pub replaced: Option<Sentence>,
    pub children: Vec<SentenceId>,
}

/// 组合设置结果
#[derive(Debug, Clone, Default)]
pub struct SettingsOutcome {
    pub inserted: Vec<SentenceId>,
    pub rebreak: Option<RebreakOutcome>,
}

/// Task 聚合根
///
/// 不变量:
/// - 句子的序号即其在 `sentences` 中的下标，始终从 0 连续
/// - 所有修改要么全部生效，要么不生效
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    status: TaskStatus,
    standard: BreakingStandard,
    char_count: Option<usize>,
    sentences: Vec<Sentence>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// 创建新任务（created 状态，尚无句子）
    pub fn new(standard: BreakingStandard, char_count: Option<usize>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            status: TaskStatus::Created,
            standard,
            char_count,
            sentences: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 从持久化数据恢复（sentences 须已按序号排列）
    pub fn restore(
        id: TaskId,
        status: TaskStatus,
        standard: BreakingStandard,
        char_count: Option<usize>,
        sentences: Vec<Sentence>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status,
            standard,
            char_count,
            sentences,
            created_at,
            updated_at,
        }
    }

    fn transition(&mut self, allowed_from: &[TaskStatus], to: TaskStatus) -> Result<(), TaskError> {
        if !allowed_from.contains(&self.status) {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn ensure_editable(&self) -> Result<(), TaskError> {
        if self.status.is_editable() {
            Ok(())
        } else {
            Err(TaskError::NotEditable(self.status))
        }
    }

    fn segment_params(&self, char_count: Option<usize>, max_text_chars: usize) -> SegmentParams {
        SegmentParams {
            char_count,
            max_text_chars,
        }
    }

    /// created → segmenting
    pub fn begin_segmenting(&mut self) -> Result<(), TaskError> {
        self.transition(&[TaskStatus::Created], TaskStatus::Segmenting)
    }

    /// 按任务的断句标准切分原文并填充句子，segmenting → ready
    pub fn populate(&mut self, text: &str, max_text_chars: usize) -> Result<usize, TaskError> {
        if self.status != TaskStatus::Segmenting {
            return Err(TaskError::InvalidTransition {
                from: self.status,
                to: TaskStatus::Ready,
            });
        }

        let params = self.segment_params(self.char_count, max_text_chars);
        let drafts = segment(text, self.standard, &params)?;

        self.sentences = drafts
            .into_iter()
            .map(|content| Sentence::new(self.id, content, VoiceParams::default(), None))
            .collect();

        self.transition(&[TaskStatus::Segmenting], TaskStatus::Ready)?;
        Ok(self.sentences.len())
    }

    /// ready / merged → synthesizing
    pub fn mark_synthesizing(&mut self) -> Result<(), TaskError> {
        if self.status == TaskStatus::Synthesizing {
            return Ok(());
        }
        self.transition(&[TaskStatus::Ready, TaskStatus::Merged], TaskStatus::Synthesizing)
    }

    /// 合并成功后进入 merged
    pub fn mark_merged(&mut self) -> Result<(), TaskError> {
        self.transition(
            &[TaskStatus::Ready, TaskStatus::Synthesizing, TaskStatus::Merged],
            TaskStatus::Merged,
        )
    }

    // Getters
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn standard(&self) -> BreakingStandard {
        self.standard
    }

    pub fn char_count(&self) -> Option<usize> {
        self.char_count
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn ordinal_of(&self, sentence_id: SentenceId) -> Option<usize> {
        self.sentences.iter().position(|s| s.id == sentence_id)
    }

    pub fn sentence(&self, sentence_id: SentenceId) -> Option<&Sentence> {
        self.sentences.iter().find(|s| s.id == sentence_id)
    }

    pub fn sentence_mut(&mut self, sentence_id: SentenceId) -> Option<&mut Sentence> {
        self.sentences.iter_mut().find(|s| s.id == sentence_id)
    }

    fn require_ordinal(&self, sentence_id: SentenceId) -> Result<usize, TaskError> {
        self.ordinal_of(sentence_id)
            .ok_or(TaskError::SentenceNotFound(sentence_id))
    }

    /// 删除句子，后续序号自动前移
    pub fn delete_sentence(&mut self, sentence_id: SentenceId) -> Result<Sentence, TaskError> {
        self.ensure_editable()?;
        let ordinal = self.require_ordinal(sentence_id)?;
        let removed = self.sentences.remove(ordinal);
        self.touch();
        Ok(removed)
    }

    /// 在父句下方插入新句，后续序号自动后移
    pub fn insert_below(
        &mut self,
        draft: InsertDraft,
        max_text_chars: usize,
    ) -> Result<SentenceId, TaskError> {
        self.ensure_editable()?;
        let ordinal = self.require_ordinal(draft.parent_id)?;
        let content = validate_content(&draft.content, max_text_chars)?;

        let voice_id = draft
            .voice_id
            .or_else(|| self.sentences[ordinal].voice.voice_id.clone());
        let voice = VoiceParams::with_voice(voice_id);
        voice.validate()?;

        let sentence = Sentence::new(self.id, content, voice, Some(draft.parent_id));
        let id = sentence.id;
        self.sentences.insert(ordinal + 1, sentence);
        self.touch();
        Ok(id)
    }

    /// 按给定标准重新切分单个句子，用子句整体替换原句
    ///
    /// 子句继承原句音色参数，停顿与合成结果清空。
    /// 结果只有一句且与原文相同时不做任何修改。
    pub fn rebreak(
        &mut self,
        sentence_id: SentenceId,
        spec: RebreakSpec,
        max_text_chars: usize,
    ) -> Result<RebreakOutcome, TaskError> {
        self.ensure_editable()?;
        let ordinal = self.require_ordinal(sentence_id)?;

        let original = &self.sentences[ordinal];
        let params = self.segment_params(spec.char_count, max_text_chars);
        let drafts = segment(&original.content, spec.standard, &params)?;

        if drafts.len() == 1 && drafts[0] == original.content {
            return Ok(RebreakOutcome {
                replaced: None,
                children: vec![sentence_id],
            });
        }

        let voice = original.voice.clone();
        let children: Vec<Sentence> = drafts
            .into_iter()
            .map(|content| Sentence::new(self.id, content, voice.clone(), Some(sentence_id)))
            .collect();
        let child_ids = children.iter().map(|s| s.id).collect();

        let replaced = self
            .sentences
            .splice(ordinal..=ordinal, children)
            .next()
            .ok_or(TaskError::SentenceNotFound(sentence_id))?;
        self.touch();

        Ok(RebreakOutcome {
            replaced: Some(replaced),
            children: child_ids,
        })
    }

    /// 部分更新句子参数
    pub fn update_settings(
        &mut self,
        sentence_id: SentenceId,
        edit: SentenceEdit,
        max_text_chars: usize,
    ) -> Result<(), TaskError> {
        self.ensure_editable()?;
        let ordinal = self.require_ordinal(sentence_id)?;

        let mut sentence = self.sentences[ordinal].clone();

        if let Patch::Set(content) = edit.content {
            sentence.content = validate_content(&content, max_text_chars)?;
            sentence.clamp_pauses();
        }
        edit.speech_rate.apply_to(&mut sentence.voice.speech_rate);
        edit.volume.apply_to(&mut sentence.voice.volume);
        edit.pitch.apply_to(&mut sentence.voice.pitch);
        edit.voice_id.apply_to(&mut sentence.voice.voice_id);
        sentence.voice.validate()?;

        if let Patch::Set(pauses) = edit.pauses {
            sentence.pauses = normalize_pauses(pauses, &sentence.content)?;
        }

        sentence.updated_at = Utc::now();
        self.sentences[ordinal] = sentence;
        self.touch();
        Ok(())
    }

    /// 组合设置：先编辑参数，再执行插入，最后重新断句
    ///
    /// 任一步失败则整体不生效。
    pub fn apply_settings(
        &mut self,
        sentence_id: SentenceId,
        change: SettingsChange,
        max_text_chars: usize,
    ) -> Result<SettingsOutcome, TaskError> {
        self.ensure_editable()?;
        self.require_ordinal(sentence_id)?;

        if change.rebreak.is_some() {
            if let Some(overlap) = change
                .insertions
                .iter()
                .find(|draft| draft.parent_id == sentence_id)
            {
                return Err(TaskError::OverlappingTargets(overlap.parent_id));
            }
        }

        let mut draft = self.clone();
        let mut outcome = SettingsOutcome::default();

        if !change.edit.is_empty() {
            draft.update_settings(sentence_id, change.edit, max_text_chars)?;
        }

        for insertion in change.insertions {
            let id = draft.insert_below(insertion, max_text_chars)?;
            outcome.inserted.push(id);
        }

        if let Some(spec) = change.rebreak {
            if draft.ordinal_of(sentence_id).is_none() {
                return Err(TaskError::StaleRebreakTarget(sentence_id));
            }
            outcome.rebreak = Some(draft.rebreak(sentence_id, spec, max_text_chars)?);
        }

        *self = draft;
        Ok(outcome)
    }

    /// 对每个句子的内容做替换，返回内容发生变化的句子 ID
    ///
    /// 只改写内容，序号与音色参数保持不变。
    pub fn rewrite_contents<F>(&mut self, mut rewrite: F) -> Result<Vec<SentenceId>, TaskError>
    where
        F: FnMut(SentenceId, &str) -> Option<String>,
    {
        self.ensure_editable()?;

        let mut changed = Vec::new();
        for sentence in &mut self.sentences {
            if let Some(content) = rewrite(sentence.id, &sentence.content) {
                if content != sentence.content && !content.trim().is_empty() {
                    sentence.content = content;
                    sentence.clamp_pauses();
                    sentence.updated_at = Utc::now();
                    changed.push(sentence.id);
                }
            }
        }

        if !changed.is_empty() {
            self.touch();
        }
        Ok(changed)
    }
}

fn validate_content(content: &str, max_text_chars: usize) -> Result<String, TaskError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(TaskError::InvalidContent("句子内容不能为空".to_string()));
    }
    let len = trimmed.chars().count();
    if len > max_text_chars {
        return Err(TaskError::InvalidContent(format!(
            "句子内容不能超过{}字（当前{}字）",
            max_text_chars, len
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::PauseKind;
    use crate::domain::text_segmenter::DEFAULT_MAX_TEXT_CHARS;

    const MAX: usize = DEFAULT_MAX_TEXT_CHARS;

    fn ready_task(text: &str) -> Task {
        let mut task = Task::new(BreakingStandard::Punctuation, None);
        task.begin_segmenting().unwrap();
        task.populate(text, MAX).unwrap();
        task
    }

    fn contents(task: &Task) -> Vec<&str> {
        task.sentences().iter().map(|s| s.content.as_str()).collect()
    }

    fn char_count_rebreak(n: usize) -> RebreakSpec {
        RebreakSpec {
            standard: BreakingStandard::CharCount,
            char_count: Some(n),
        }
    }

    #[test]
    fn test_task_lifecycle() {
        let mut task = Task::new(BreakingStandard::Punctuation, None);
        assert_eq!(task.status(), TaskStatus::Created);

        task.begin_segmenting().unwrap();
        let count = task.populate("这是一段测试文本。用于验证系统功能。", MAX).unwrap();

        assert_eq!(count, 2);
        assert_eq!(task.status(), TaskStatus::Ready);
        assert_eq!(contents(&task), vec!["这是一段测试文本。", "用于验证系统功能。"]);
        assert_eq!(task.ordinal_of(task.sentences()[1].id), Some(1));

        task.mark_synthesizing().unwrap();
        task.mark_merged().unwrap();
        assert_eq!(task.status(), TaskStatus::Merged);
    }

    #[test]
    fn test_populate_requires_segmenting() {
        let mut task = Task::new(BreakingStandard::Punctuation, None);
        assert!(matches!(
            task.populate("内容。", MAX),
            Err(TaskError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_edit_before_ready_rejected() {
        let mut task = Task::new(BreakingStandard::Punctuation, None);
        let result = task.delete_sentence(SentenceId::new());
        assert!(matches!(result, Err(TaskError::NotEditable(TaskStatus::Created))));
    }

    #[test]
    fn test_insert_below_shifts_ordinals() {
        let mut task = ready_task("第一句。第二句。");
        let first = task.sentences()[0].id;
        let second = task.sentences()[1].id;

        let inserted = task
            .insert_below(
                InsertDraft {
                    parent_id: first,
                    content: "X".to_string(),
                    voice_id: None,
                },
                MAX,
            )
            .unwrap();

        assert_eq!(task.sentence_count(), 3);
        assert_eq!(task.ordinal_of(inserted), Some(1));
        assert_eq!(task.sentence(inserted).unwrap().parent_id, Some(first));
        assert_eq!(task.ordinal_of(second), Some(2));
    }

    #[test]
    fn test_insert_inherits_parent_voice() {
        let mut task = ready_task("第一句。");
        let first = task.sentences()[0].id;
        task.update_settings(
            first,
            SentenceEdit {
                voice_id: Patch::Set(Some("narrator".to_string())),
                speech_rate: Patch::Set(20),
                ..Default::default()
            },
            MAX,
        )
        .unwrap();

        let inserted = task
            .insert_below(
                InsertDraft {
                    parent_id: first,
                    content: "补充。".to_string(),
                    voice_id: None,
                },
                MAX,
            )
            .unwrap();

        let voice = &task.sentence(inserted).unwrap().voice;
        assert_eq!(voice.voice_id.as_deref(), Some("narrator"));
        assert_eq!(voice.speech_rate, 0);
    }

    #[test]
    fn test_insert_below_missing_parent() {
        let mut task = ready_task("第一句。");
        let missing = SentenceId::new();
        let result = task.insert_below(
            InsertDraft {
                parent_id: missing,
                content: "X".to_string(),
                voice_id: None,
            },
            MAX,
        );
        assert!(matches!(result, Err(TaskError::SentenceNotFound(id)) if id == missing));
    }

    #[test]
    fn test_delete_renumbers() {
        let mut task = ready_task("一。二。三。");
        let first = task.sentences()[0].id;
        let third = task.sentences()[2].id;

        let removed = task.delete_sentence(first).unwrap();
        assert_eq!(removed.content, "一。");
        assert_eq!(task.ordinal_of(third), Some(1));
        assert!(matches!(
            task.delete_sentence(first),
            Err(TaskError::SentenceNotFound(_))
        ));
    }

    #[test]
    fn test_rebreak_by_char_count() {
        let mut task = ready_task("一二三四五六七八九十甲乙\n后面的句子。");
        let first = task.sentences()[0].id;
        let later = task.sentences()[1].id;

        let outcome = task.rebreak(first, char_count_rebreak(5), MAX).unwrap();

        assert_eq!(outcome.children.len(), 3);
        assert_eq!(outcome.replaced.unwrap().id, first);
        assert_eq!(task.sentence_count(), 4);
        assert_eq!(contents(&task)[..3], ["一二三四五", "六七八九十", "甲乙"]);
        assert!(task.sentences()[..3]
            .iter()
            .all(|s| s.parent_id == Some(first)));
        assert_eq!(task.ordinal_of(later), Some(3));
        assert!(task.sentence(first).is_none());
    }

    #[test]
    fn test_rebreak_without_change_is_noop() {
        let mut task = ready_task("短句。");
        let first = task.sentences()[0].id;

        let outcome = task
            .rebreak(
                first,
                RebreakSpec {
                    standard: BreakingStandard::Punctuation,
                    char_count: None,
                },
                MAX,
            )
            .unwrap();

        assert!(outcome.replaced.is_none());
        assert_eq!(outcome.children, vec![first]);
        assert_eq!(task.sentences()[0].id, first);
    }

    #[test]
    fn test_update_settings_partial() {
        let mut task = ready_task("一二三四。");
        let id = task.sentences()[0].id;

        task.update_settings(
            id,
            SentenceEdit {
                volume: Patch::Set(5),
                pauses: Patch::Set(vec![Pause {
                    position: 2,
                    duration_ms: 300,
                    kind: PauseKind::Pause,
                }]),
                ..Default::default()
            },
            MAX,
        )
        .unwrap();
        task.update_settings(
            id,
            SentenceEdit {
                pitch: Patch::Set(-2),
                ..Default::default()
            },
            MAX,
        )
        .unwrap();

        let sentence = task.sentence(id).unwrap();
        assert_eq!(sentence.voice.volume, 5);
        assert_eq!(sentence.voice.pitch, -2);
        assert_eq!(sentence.voice.speech_rate, 0);
        assert_eq!(sentence.pauses.len(), 1);
        assert_eq!(sentence.content, "一二三四。");
    }

    #[test]
    fn test_update_settings_invalid_leaves_sentence_untouched() {
        let mut task = ready_task("一二三四。");
        let id = task.sentences()[0].id;

        let result = task.update_settings(
            id,
            SentenceEdit {
                volume: Patch::Set(7),
                pitch: Patch::Set(500),
                ..Default::default()
            },
            MAX,
        );

        assert!(matches!(result, Err(TaskError::InvalidVoiceParams(_))));
        assert_eq!(task.sentence(id).unwrap().voice.volume, 0);
    }

    #[test]
    fn test_shorter_content_drops_out_of_range_pauses() {
        let mut task = ready_task("一二三四五六。");
        let id = task.sentences()[0].id;
        task.update_settings(
            id,
            SentenceEdit {
                pauses: Patch::Set(vec![
                    Pause {
                        position: 1,
                        duration_ms: 100,
                        kind: PauseKind::Pause,
                    },
                    Pause {
                        position: 6,
                        duration_ms: 100,
                        kind: PauseKind::Silence,
                    },
                ]),
                ..Default::default()
            },
            MAX,
        )
        .unwrap();

        task.update_settings(
            id,
            SentenceEdit {
                content: Patch::Set("一二。".to_string()),
                ..Default::default()
            },
            MAX,
        )
        .unwrap();

        let sentence = task.sentence(id).unwrap();
        assert_eq!(sentence.pauses.len(), 1);
        assert_eq!(sentence.pauses[0].position, 1);
    }

    #[test]
    fn test_apply_settings_order() {
        let mut task = ready_task("一二三四五六七八九十甲乙\n尾句。");
        let first = task.sentences()[0].id;
        let tail = task.sentences()[1].id;

        let outcome = task
            .apply_settings(
                first,
                SettingsChange {
                    edit: SentenceEdit {
                        speech_rate: Patch::Set(10),
                        ..Default::default()
                    },
                    insertions: vec![InsertDraft {
                        parent_id: tail,
                        content: "追加。".to_string(),
                        voice_id: Some("v2".to_string()),
                    }],
                    rebreak: Some(char_count_rebreak(5)),
                },
                MAX,
            )
            .unwrap();

        assert_eq!(outcome.inserted.len(), 1);
        let rebreak = outcome.rebreak.unwrap();
        assert_eq!(rebreak.children.len(), 3);
        assert_eq!(
            contents(&task),
            vec!["一二三四五", "六七八九十", "甲乙", "尾句。", "追加。"]
        );
        // 编辑先于断句，子句继承新语速
        assert!(task.sentences()[..3].iter().all(|s| s.voice.speech_rate == 10));
    }

    #[test]
    fn test_apply_settings_rejects_overlap() {
        let mut task = ready_task("一二三四五六。");
        let first = task.sentences()[0].id;

        let result = task.apply_settings(
            first,
            SettingsChange {
                insertions: vec![InsertDraft {
                    parent_id: first,
                    content: "X".to_string(),
                    voice_id: None,
                }],
                rebreak: Some(char_count_rebreak(2)),
                ..Default::default()
            },
            MAX,
        );

        assert!(matches!(result, Err(TaskError::OverlappingTargets(id)) if id == first));
        assert_eq!(task.sentence_count(), 1);
    }

    #[test]
    fn test_apply_settings_is_atomic() {
        let mut task = ready_task("一二三。");
        let first = task.sentences()[0].id;

        let result = task.apply_settings(
            first,
            SettingsChange {
                edit: SentenceEdit {
                    volume: Patch::Set(9),
                    ..Default::default()
                },
                insertions: vec![
                    InsertDraft {
                        parent_id: first,
                        content: "有效。".to_string(),
                        voice_id: None,
                    },
                    InsertDraft {
                        parent_id: SentenceId::new(),
                        content: "父句不存在。".to_string(),
                        voice_id: None,
                    },
                ],
                rebreak: None,
            },
            MAX,
        );

        assert!(result.is_err());
        assert_eq!(task.sentence_count(), 1);
        assert_eq!(task.sentence(first).unwrap().voice.volume, 0);
    }

    #[test]
    fn test_rewrite_contents_reports_changed() {
        let mut task = ready_task("今年是2025年。没有数字。");
        let changed = task
            .rewrite_contents(|_, text| Some(text.replace("2025", "二零二五")))
            .unwrap();

        assert_eq!(changed, vec![task.sentences()[0].id]);
        assert_eq!(task.sentences()[0].content, "今年是二零二五年。");
    }

    #[test]
    fn test_rewrite_contents_skips_declined_sentences() {
        let mut task = ready_task("2025年。2025年。");
        let first = task.sentences()[0].id;
        let changed = task
            .rewrite_contents(|id, text| (id != first).then(|| text.replace("2025", "二零")))
            .unwrap();

        assert_eq!(changed, vec![task.sentences()[1].id]);
        assert_eq!(task.sentences()[0].content, "2025年。");
    }

    #[test]
    fn test_coverage_after_mutations() {
        let text = "一二三四五六七八九十甲乙。第二句。第三句。";
        let mut task = ready_task(text);
        let first = task.sentences()[0].id;
        let second = task.sentences()[1].id;

        task.rebreak(first, char_count_rebreak(4), MAX).unwrap();
        let inserted = task
            .insert_below(
                InsertDraft {
                    parent_id: second,
                    content: "插入。".to_string(),
                    voice_id: None,
                },
                MAX,
            )
            .unwrap();
        task.delete_sentence(inserted).unwrap();

        let joined: String = contents(&task).concat();
        assert_eq!(joined, text);
        for (ordinal, sentence) in task.sentences().iter().enumerate() {
            assert_eq!(task.ordinal_of(sentence.id), Some(ordinal));
        }
    }
}
