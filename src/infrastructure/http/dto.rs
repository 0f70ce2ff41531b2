//! Data Transfer Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::code;
use crate::application::commands::handlers::{RebreakResult, SettingsResult};
use crate::application::commands::VoiceOverride;
use crate::application::ports::{MergeJob, Page, SentenceRecord, TaskSummary};
use crate::application::queries::handlers::{
    BatchStatus, RuleEntry, RuleHit, StandardInfo, SynthesisView, TaskSynthesisView,
};
use crate::domain::reading_rule::{ReadingRule, RuleSetting};
use crate::domain::VoiceProfile;
use crate::domain::task::{Patch, Pause, SentenceId, TaskId};

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: i32,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: code::SUCCESS,
            message: "success".to_string(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    pub fn ok() -> Self {
        Self::success(Empty {})
    }
}

/// 分页响应
#[derive(Debug, Serialize)]
pub struct PageResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}

impl<T: Serialize> PageResponse<T> {
    pub fn from_page<S>(page: Page<S>, f: impl FnMut(S) -> T) -> Self {
        let page = page.map(f);
        Self {
            items: page.items,
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

// ============================================================================
// Task DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub content: String,
    pub breaking_standard_id: Option<u8>,
    pub char_count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: TaskId,
    pub status: String,
    pub breaking_standard_id: u8,
    pub breaking_standard: &'static str,
    pub char_count: Option<usize>,
    pub sentence_count: usize,
    pub succeeded_count: usize,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskSummary> for TaskResponse {
    fn from(summary: TaskSummary) -> Self {
        Self {
            id: summary.id,
            status: summary.status.as_str().to_string(),
            breaking_standard_id: summary.standard.id(),
            breaking_standard: summary.standard.name(),
            char_count: summary.char_count,
            sentence_count: summary.sentence_count,
            succeeded_count: summary.succeeded_count,
            progress: summary.progress(),
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StandardResponse {
    pub id: u8,
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requires_char_count: bool,
}

impl From<StandardInfo> for StandardResponse {
    fn from(info: StandardInfo) -> Self {
        Self {
            id: info.id,
            key: info.key,
            name: info.name,
            description: info.description,
            requires_char_count: info.requires_char_count,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListVoicesQuery {
    pub recommended: Option<bool>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub voice_id: String,
    pub name: String,
    pub voice_type: String,
    pub language: String,
    pub recommended: bool,
    pub sort_order: i32,
    pub avatar_url: Option<String>,
}

impl From<VoiceProfile> for VoiceResponse {
    fn from(voice: VoiceProfile) -> Self {
        Self {
            voice_id: voice.voice_id,
            name: voice.name,
            voice_type: voice.voice_type,
            language: voice.language,
            recommended: voice.recommended,
            sort_order: voice.sort_order,
            avatar_url: voice.avatar_url,
        }
    }
}

// ============================================================================
// Sentence DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SentenceResponse {
    pub id: SentenceId,
    pub task_id: TaskId,
    pub parent_id: Option<SentenceId>,
    pub ordinal: usize,
    pub content: String,
    pub char_count: usize,
    pub voice_id: Option<String>,
    pub speech_rate: i32,
    pub volume: i32,
    pub pitch: i32,
    pub pauses: Vec<Pause>,
    pub synthesis_status: &'static str,
    pub audio_duration_ms: Option<u64>,
    pub synthesis_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SentenceRecord> for SentenceResponse {
    fn from(record: SentenceRecord) -> Self {
        let s = record.sentence;
        Self {
            id: s.id,
            task_id: s.task_id,
            parent_id: s.parent_id,
            ordinal: record.ordinal,
            char_count: s.content.chars().count(),
            content: s.content,
            voice_id: s.voice.voice_id,
            speech_rate: s.voice.speech_rate,
            volume: s.voice.volume,
            pitch: s.voice.pitch,
            pauses: s.pauses,
            synthesis_status: s.synthesis.status.as_str(),
            audio_duration_ms: s.synthesis.audio.map(|a| a.duration_ms),
            synthesis_error: s.synthesis.error,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

fn records(items: Vec<SentenceRecord>) -> Vec<SentenceResponse> {
    items.into_iter().map(SentenceResponse::from).collect()
}

#[derive(Debug, Deserialize)]
pub struct InsertSentenceRequest {
    pub content: String,
    pub voice_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RebreakRequest {
    pub breaking_standard_id: u8,
    pub char_count: Option<usize>,
}

/// 组合设置中的插入项；parent_id 缺省为目标句子
#[derive(Debug, Deserialize)]
pub struct SettingsInsertion {
    pub parent_id: Option<SentenceId>,
    pub content: String,
    pub voice_id: Option<String>,
}

/// 组合设置：未出现的字段不修改
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SentenceSettingsRequest {
    pub content: Patch<String>,
    pub voice_id: Patch<Option<String>>,
    pub speech_rate: Patch<i32>,
    pub volume: Patch<i32>,
    pub pitch: Patch<i32>,
    pub pauses: Patch<Vec<Pause>>,
    pub insertions: Vec<SettingsInsertion>,
    pub rebreak: Option<RebreakRequest>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub sentence: Option<SentenceResponse>,
    pub inserted: Vec<SentenceResponse>,
    pub children: Vec<SentenceResponse>,
}

impl From<SettingsResult> for SettingsResponse {
    fn from(result: SettingsResult) -> Self {
        Self {
            sentence: result.sentence.map(SentenceResponse::from),
            inserted: records(result.inserted),
            children: records(result.children),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RebreakResponse {
    pub replaced: bool,
    pub children: Vec<SentenceResponse>,
}

impl From<RebreakResult> for RebreakResponse {
    fn from(result: RebreakResult) -> Self {
        Self {
            replaced: result.replaced,
            children: records(result.children),
        }
    }
}

// ============================================================================
// Synthesis DTOs
// ============================================================================

/// 合成前写入句子的音色参数
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SynthesizeRequest {
    pub voice_id: Patch<Option<String>>,
    pub speech_rate: Patch<i32>,
    pub volume: Patch<i32>,
    pub pitch: Patch<i32>,
}

impl From<SynthesizeRequest> for VoiceOverride {
    fn from(req: SynthesizeRequest) -> Self {
        VoiceOverride {
            voice_id: req.voice_id,
            speech_rate: req.speech_rate,
            volume: req.volume,
            pitch: req.pitch,
        }
    }
}

/// sentence_ids 缺省或为空时合成全部句子
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BatchSynthesizeRequest {
    pub sentence_ids: Option<Vec<SentenceId>>,
    pub voice_id: Patch<Option<String>>,
    pub speech_rate: Patch<i32>,
    pub volume: Patch<i32>,
    pub pitch: Patch<i32>,
}

impl BatchSynthesizeRequest {
    pub fn into_parts(self) -> (Vec<SentenceId>, VoiceOverride) {
        let voice = VoiceOverride {
            voice_id: self.voice_id,
            speech_rate: self.speech_rate,
            volume: self.volume,
            pitch: self.pitch,
        };
        (self.sentence_ids.unwrap_or_default(), voice)
    }
}

#[derive(Debug, Serialize)]
pub struct SynthesisResponse {
    pub sentence_id: SentenceId,
    pub task_id: TaskId,
    pub job_id: Option<Uuid>,
    pub generation: u64,
    pub status: &'static str,
    pub audio_duration_ms: Option<u64>,
    pub error: Option<String>,
    pub coalesced: bool,
}

impl From<SynthesisView> for SynthesisResponse {
    fn from(view: SynthesisView) -> Self {
        Self {
            sentence_id: view.sentence_id,
            task_id: view.task_id,
            job_id: view.job_id,
            generation: view.generation,
            status: view.status.as_str(),
            audio_duration_ms: view.audio.map(|a| a.duration_ms),
            error: view.error,
            coalesced: view.coalesced,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchSynthesisResponse {
    pub task_id: TaskId,
    pub jobs: Vec<SynthesisResponse>,
}

#[derive(Debug, Serialize)]
pub struct TaskSynthesisResponse {
    pub task_id: TaskId,
    pub status: BatchStatus,
    pub total: usize,
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub not_started: usize,
    pub progress: u8,
    pub sentences: Vec<SynthesisResponse>,
}

impl From<TaskSynthesisView> for TaskSynthesisResponse {
    fn from(view: TaskSynthesisView) -> Self {
        Self {
            task_id: view.task_id,
            status: view.status,
            total: view.total,
            queued: view.queued,
            running: view.running,
            succeeded: view.succeeded,
            failed: view.failed,
            not_started: view.not_started,
            progress: view.progress,
            sentences: view.sentences.into_iter().map(SynthesisResponse::from).collect(),
        }
    }
}

// ============================================================================
// Reading Rule DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    /// global / task（或 1 / 2）
    pub scope: String,
    pub task_id: Option<TaskId>,
    /// 编号、英文名或中文名
    pub rule_type: String,
    pub pattern: String,
    pub rule_value: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRulesQuery {
    pub scope: Option<String>,
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Deserialize)]
pub struct ApplyRuleRequest {
    pub task_id: TaskId,
}

#[derive(Debug, Deserialize)]
pub struct MatchRulesRequest {
    pub text: String,
    pub task_id: Option<TaskId>,
}

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub id: Uuid,
    pub scope: &'static str,
    pub task_id: Option<TaskId>,
    pub rule_type: &'static str,
    pub rule_type_label: &'static str,
    pub pattern: String,
    pub rule_value: String,
    pub created_at: DateTime<Utc>,
    /// 在查询任务中是否启用
    pub enabled: bool,
}

impl From<ReadingRule> for RuleResponse {
    fn from(rule: ReadingRule) -> Self {
        Self {
            id: *rule.id.as_uuid(),
            scope: rule.scope.as_str(),
            task_id: rule.task_id,
            rule_type: rule.rule_type.as_str(),
            rule_type_label: rule.rule_type.label(),
            pattern: rule.pattern,
            rule_value: rule.rule_value,
            created_at: rule.created_at,
            enabled: true,
        }
    }
}

impl From<RuleEntry> for RuleResponse {
    fn from(entry: RuleEntry) -> Self {
        Self {
            enabled: entry.enabled,
            ..Self::from(entry.rule)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RuleSettingRequest {
    pub task_id: TaskId,
    /// 缺省时作用于整个任务
    pub sentence_id: Option<SentenceId>,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct RuleSettingResponse {
    pub rule_id: Uuid,
    pub task_id: TaskId,
    pub sentence_id: Option<SentenceId>,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<RuleSetting> for RuleSettingResponse {
    fn from(setting: RuleSetting) -> Self {
        Self {
            rule_id: *setting.rule_id.as_uuid(),
            task_id: setting.task_id,
            sentence_id: setting.sentence_id,
            enabled: setting.enabled,
            updated_at: setting.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApplyRuleResponse {
    pub modified: usize,
}

#[derive(Debug, Serialize)]
pub struct RuleHitResponse {
    pub rule_id: Uuid,
    pub rule_type: &'static str,
    pub pattern: String,
    pub rule_value: String,
    pub start: usize,
    pub end: usize,
}

impl From<RuleHit> for RuleHitResponse {
    fn from(hit: RuleHit) -> Self {
        Self {
            rule_id: *hit.rule_id.as_uuid(),
            rule_type: hit.rule_type.as_str(),
            pattern: hit.pattern,
            rule_value: hit.rule_value,
            start: hit.start,
            end: hit.end,
        }
    }
}

// ============================================================================
// Merge DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub sentence_ids: Vec<SentenceId>,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub id: Uuid,
    pub task_id: TaskId,
    pub sentence_ids: Vec<SentenceId>,
    pub state: &'static str,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MergeJob> for MergeResponse {
    fn from(job: MergeJob) -> Self {
        Self {
            id: job.id,
            task_id: job.task_id,
            sentence_ids: job.sentence_ids,
            state: job.state.as_str(),
            duration_ms: job.duration_ms,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_request_distinguishes_absent_and_null() {
        let req: SentenceSettingsRequest =
            serde_json::from_str(r#"{"voice_id": null, "volume": 3}"#).unwrap();
        assert_eq!(req.voice_id, Patch::Set(None));
        assert_eq!(req.volume, Patch::Set(3));
        assert_eq!(req.speech_rate, Patch::Absent);
        assert_eq!(req.content, Patch::Absent);
        assert!(req.insertions.is_empty());
        assert!(req.rebreak.is_none());
    }

    #[test]
    fn test_batch_request_defaults_to_all_sentences() {
        let req: BatchSynthesizeRequest = serde_json::from_str("{}").unwrap();
        let (ids, voice) = req.into_parts();
        assert!(ids.is_empty());
        assert!(voice.is_empty());
    }

    #[test]
    fn test_rule_setting_request_defaults_to_task() {
        let task_id = TaskId::new();
        let body = format!(r#"{{"task_id": "{}", "enabled": false}}"#, task_id);
        let req: RuleSettingRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(req.task_id, task_id);
        assert!(req.sentence_id.is_none());
        assert!(!req.enabled);
    }

    #[test]
    fn test_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::ok()).unwrap();
        assert_eq!(json["code"], 10200);
        assert_eq!(json["message"], "success");
        assert!(json["data"].is_object());
    }
}
