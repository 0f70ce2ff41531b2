//! Reading Rule Context - ReadingRule

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RuleError;
use crate::domain::task::TaskId;

/// 阅读规则唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(Uuid);

impl RuleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 规则作用范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    Global,
    Task,
}

impl RuleScope {
    pub fn code(&self) -> u8 {
        match self {
            RuleScope::Global => 1,
            RuleScope::Task => 2,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, RuleError> {
        match code {
            1 => Ok(RuleScope::Global),
            2 => Ok(RuleScope::Task),
            other => Err(RuleError::UnknownScope(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleScope::Global => "global",
            RuleScope::Task => "task",
        }
    }

    pub fn parse(s: &str) -> Result<Self, RuleError> {
        match s.trim() {
            "global" | "1" => Ok(RuleScope::Global),
            "task" | "2" => Ok(RuleScope::Task),
            other => Err(RuleError::UnknownScope(other.to_string())),
        }
    }
}

/// 规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// 数字读法：只匹配完整的数字串
    NumberReading,
    /// 音标调整
    Phonetic,
    /// 专有词汇
    ProperNoun,
}

impl RuleType {
    pub fn code(&self) -> u8 {
        match self {
            RuleType::NumberReading => 1,
            RuleType::Phonetic => 2,
            RuleType::ProperNoun => 3,
        }
    }

    pub fn from_code(code: u8) -> Result<Self, RuleError> {
        match code {
            1 => Ok(RuleType::NumberReading),
            2 => Ok(RuleType::Phonetic),
            3 => Ok(RuleType::ProperNoun),
            other => Err(RuleError::UnknownRuleType(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::NumberReading => "number_reading",
            RuleType::Phonetic => "phonetic",
            RuleType::ProperNoun => "proper_noun",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleType::NumberReading => "数字读法",
            RuleType::Phonetic => "音标调整",
            RuleType::ProperNoun => "专有词汇",
        }
    }

    /// 接受编号、英文名或中文名
    pub fn parse(s: &str) -> Result<Self, RuleError> {
        match s.trim() {
            "1" | "number_reading" | "数字读法" | "数字英文" => Ok(RuleType::NumberReading),
            "2" | "phonetic" | "音标调整" => Ok(RuleType::Phonetic),
            "3" | "proper_noun" | "专有词汇" => Ok(RuleType::ProperNoun),
            other => Err(RuleError::UnknownRuleType(other.to_string())),
        }
    }
}

/// 一次匹配的位置（字符偏移，左闭右开）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub start: usize,
    pub end: usize,
}

/// 阅读规则
///
/// 不变量:
/// - pattern 非空
/// - scope 为 Task 时 task_id 必填，Global 时为空
/// - 数字读法规则的 pattern 只含 ASCII 数字
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRule {
    pub id: RuleId,
    pub scope: RuleScope,
    pub task_id: Option<TaskId>,
    pub rule_type: RuleType,
    pub pattern: String,
    pub rule_value: String,
    pub created_at: DateTime<Utc>,
}

impl ReadingRule {
    pub fn new(
        scope: RuleScope,
        task_id: Option<TaskId>,
        rule_type: RuleType,
        pattern: &str,
        rule_value: &str,
    ) -> Result<Self, RuleError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(RuleError::EmptyPattern);
        }

        match (scope, task_id) {
            (RuleScope::Task, None) => return Err(RuleError::MissingTask),
            (RuleScope::Global, Some(_)) => return Err(RuleError::UnexpectedTask),
            _ => {}
        }

        if rule_type == RuleType::NumberReading && !pattern.chars().all(|c| c.is_ascii_digit()) {
            return Err(RuleError::InvalidNumberPattern(pattern.to_string()));
        }

        Ok(Self {
            id: RuleId::new(),
            scope,
            task_id,
            rule_type,
            pattern: pattern.to_string(),
            rule_value: rule_value.to_string(),
            created_at: Utc::now(),
        })
    }

    /// 规则是否可作用于该任务
    pub fn applies_to(&self, task_id: TaskId) -> bool {
        match self.scope {
            RuleScope::Global => true,
            RuleScope::Task => self.task_id == Some(task_id),
        }
    }

    pub fn ensure_applies_to(&self, task_id: TaskId) -> Result<(), RuleError> {
        if self.applies_to(task_id) {
            Ok(())
        } else {
            Err(RuleError::OutOfScope {
                rule_id: self.id,
                task_id,
            })
        }
    }

    /// 匹配位置（字节偏移）
    fn byte_ranges(&self, text: &str) -> Vec<(usize, usize)> {
        match self.rule_type {
            RuleType::NumberReading => numeral_spans(text)
                .into_iter()
                .filter(|&(start, end)| &text[start..end] == self.pattern)
                .collect(),
            RuleType::Phonetic | RuleType::ProperNoun => text
                .match_indices(self.pattern.as_str())
                .map(|(start, m)| (start, start + m.len()))
                .collect(),
        }
    }

    /// 文本中所有匹配的位置（字符偏移）
    pub fn find_matches(&self, text: &str) -> Vec<RuleMatch> {
        self.byte_ranges(text)
            .into_iter()
            .map(|(start, end)| {
                let start_chars = text[..start].chars().count();
                RuleMatch {
                    start: start_chars,
                    end: start_chars + text[start..end].chars().count(),
                }
            })
            .collect()
    }

    /// 执行替换，无匹配时返回 None
    pub fn apply_to(&self, text: &str) -> Option<String> {
        let ranges = self.byte_ranges(text);
        if ranges.is_empty() {
            return None;
        }

        let mut result = String::with_capacity(text.len());
        let mut cursor = 0;
        for (start, end) in ranges {
            result.push_str(&text[cursor..start]);
            result.push_str(&self.rule_value);
            cursor = end;
        }
        result.push_str(&text[cursor..]);
        Some(result)
    }
}

/// 文本中所有最长 ASCII 数字串的字节区间
fn numeral_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        match (ch.is_ascii_digit(), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_rule(pattern: &str, value: &str) -> ReadingRule {
        ReadingRule::new(RuleScope::Global, None, RuleType::NumberReading, pattern, value).unwrap()
    }

    #[test]
    fn test_number_rule_matches_whole_numerals_only() {
        let rule = number_rule("2025", "二零二五");

        assert_eq!(
            rule.apply_to("2025年，不是120250。").as_deref(),
            Some("二零二五年，不是120250。")
        );
        assert!(rule.apply_to("编号120250").is_none());
    }

    #[test]
    fn test_apply_is_idempotent() {
        let rule = number_rule("2025", "二零二五");
        let once = rule.apply_to("2025年2025").unwrap();
        assert_eq!(once, "二零二五年二零二五");
        assert!(rule.apply_to(&once).is_none());
    }

    #[test]
    fn test_literal_rule_and_char_offsets() {
        let rule = ReadingRule::new(
            RuleScope::Global,
            None,
            RuleType::ProperNoun,
            "AI",
            "人工智能",
        )
        .unwrap();

        let matches = rule.find_matches("你好AI，再见AI");
        assert_eq!(
            matches,
            vec![RuleMatch { start: 2, end: 4 }, RuleMatch { start: 7, end: 9 }]
        );
        assert_eq!(rule.apply_to("你好AI").as_deref(), Some("你好人工智能"));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            ReadingRule::new(RuleScope::Global, None, RuleType::Phonetic, "  ", "x"),
            Err(RuleError::EmptyPattern)
        ));
        assert!(matches!(
            ReadingRule::new(RuleScope::Task, None, RuleType::Phonetic, "行", "háng"),
            Err(RuleError::MissingTask)
        ));
        assert!(matches!(
            ReadingRule::new(RuleScope::Global, None, RuleType::NumberReading, "12a", "x"),
            Err(RuleError::InvalidNumberPattern(_))
        ));
    }

    #[test]
    fn test_scope() {
        let task_id = TaskId::new();
        let rule = ReadingRule::new(
            RuleScope::Task,
            Some(task_id),
            RuleType::Phonetic,
            "行",
            "háng",
        )
        .unwrap();

        assert!(rule.ensure_applies_to(task_id).is_ok());
        assert!(matches!(
            rule.ensure_applies_to(TaskId::new()),
            Err(RuleError::OutOfScope { .. })
        ));
        assert!(number_rule("1", "一").applies_to(TaskId::new()));
    }

    #[test]
    fn test_parse_rule_type() {
        assert_eq!(RuleType::parse("数字读法").unwrap(), RuleType::NumberReading);
        assert_eq!(RuleType::parse("3").unwrap(), RuleType::ProperNoun);
        assert!(RuleType::parse("unknown").is_err());
        assert_eq!(RuleScope::from_code(2).unwrap(), RuleScope::Task);
    }
}
