//! 文本分割器
//!
//! 按断句标准把长文本切分为有序的句子草稿。纯函数，无状态：
//! 相同的 (text, standard, params) 总是得到相同的结果，重新断句的幂等性依赖于此。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 默认最大文本长度（字符数）
pub const DEFAULT_MAX_TEXT_CHARS: usize = 10_000;

/// 分割错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    #[error("文本内容不能为空")]
    Empty,

    #[error("文本内容不能超过{limit}字（当前{actual}字）")]
    TooLong { limit: usize, actual: usize },

    #[error("断句标准「{0}」需要正整数 char_count")]
    MissingCharCount(&'static str),

    #[error("未知的断句标准: {0}")]
    UnknownStandard(u8),
}

/// 断句标准
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakingStandard {
    /// 按句末标点断句
    Punctuation,
    /// 按固定字符数断句
    CharCount,
    /// 先按标点，再把超长句按字符数切分
    Hybrid,
}

impl BreakingStandard {
    pub const ALL: [BreakingStandard; 3] = [
        BreakingStandard::Punctuation,
        BreakingStandard::CharCount,
        BreakingStandard::Hybrid,
    ];

    /// 对外暴露的稳定编号
    pub fn id(&self) -> u8 {
        match self {
            BreakingStandard::Punctuation => 1,
            BreakingStandard::CharCount => 2,
            BreakingStandard::Hybrid => 3,
        }
    }

    pub fn from_id(id: u8) -> Result<Self, SegmentError> {
        match id {
            1 => Ok(BreakingStandard::Punctuation),
            2 => Ok(BreakingStandard::CharCount),
            3 => Ok(BreakingStandard::Hybrid),
            other => Err(SegmentError::UnknownStandard(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BreakingStandard::Punctuation => "大符号断句",
            BreakingStandard::CharCount => "N个字符断句",
            BreakingStandard::Hybrid => "大符号+字符数断句",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BreakingStandard::Punctuation => "在句号、问号、感叹号、分号等句末标点及换行处断句",
            BreakingStandard::CharCount => "每行按固定字符数切分，最后一段可以不足",
            BreakingStandard::Hybrid => "先按句末标点断句，超过字符数的句子再按字符数切分",
        }
    }

    pub fn requires_char_count(&self) -> bool {
        !matches!(self, BreakingStandard::Punctuation)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BreakingStandard::Punctuation => "punctuation",
            BreakingStandard::CharCount => "char_count",
            BreakingStandard::Hybrid => "hybrid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "punctuation" => Some(BreakingStandard::Punctuation),
            "char_count" => Some(BreakingStandard::CharCount),
            "hybrid" => Some(BreakingStandard::Hybrid),
            _ => None,
        }
    }
}

/// 分割参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentParams {
    /// 每句字符数（CharCount / Hybrid 必填）
    pub char_count: Option<usize>,
    /// 输入文本最大字符数
    pub max_text_chars: usize,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            char_count: None,
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }
}

impl SegmentParams {
    pub fn with_char_count(mut self, char_count: usize) -> Self {
        self.char_count = Some(char_count);
        self
    }
}

/// 句末分隔符（总是断句）
#[inline]
fn is_sentence_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '！' | '？' | '!' | '?' | '；' | ';' | '…')
}

/// 收尾符号（引号、括号），单独成句时并入前一句
#[inline]
fn is_closing_mark(ch: char) -> bool {
    matches!(
        ch,
        '"' | '\'' | '\u{201D}' | '\u{2019}' | '）' | ')' | '」' | '』' | '】' | '》'
    )
}

/// 检查片段是否只包含收尾符号或空白
#[inline]
fn is_trivial_segment(s: &str) -> bool {
    s.chars().all(|c| is_closing_mark(c) || c.is_whitespace())
}

/// 按句末标点分割单行文本
///
/// 连续的分隔符（如 "！？"、"……"）以及紧随其后的收尾符号视为一个断点。
fn split_by_punctuation(line: &str) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);

        if is_sentence_delimiter(ch) {
            while let Some(&next) = chars.peek() {
                if is_sentence_delimiter(next) || is_closing_mark(next) {
                    current.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            push_piece(&mut segments, &current);
            current.clear();
        }
    }

    push_piece(&mut segments, &current);
    segments
}

fn push_piece(segments: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    if is_trivial_segment(trimmed) {
        if let Some(last) = segments.last_mut() {
            last.push_str(trimmed);
            return;
        }
    }
    segments.push(trimmed.to_string());
}

/// 按固定字符数切分
fn split_by_char_count(text: &str, char_count: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(char_count)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect()
}

/// 对文本进行断句
///
/// 换行总是断点；每行去掉首尾空白后按 `standard` 处理。
/// 输出按顺序拼接（忽略空白）即为原文。
pub fn segment(
    text: &str,
    standard: BreakingStandard,
    params: &SegmentParams,
) -> Result<Vec<String>, SegmentError> {
    if text.trim().is_empty() {
        return Err(SegmentError::Empty);
    }

    let actual = text.chars().count();
    if actual > params.max_text_chars {
        return Err(SegmentError::TooLong {
            limit: params.max_text_chars,
            actual,
        });
    }

    let char_count = if standard.requires_char_count() {
        let n = params
            .char_count
            .filter(|n| *n > 0)
            .ok_or(SegmentError::MissingCharCount(standard.name()))?;
        Some(n)
    } else {
        None
    };

    let mut segments = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match (standard, char_count) {
            (BreakingStandard::CharCount, Some(n)) => {
                segments.extend(split_by_char_count(line, n));
            }
            (BreakingStandard::Hybrid, Some(n)) => {
                for piece in split_by_punctuation(line) {
                    if piece.chars().count() > n {
                        segments.extend(split_by_char_count(&piece, n));
                    } else {
                        segments.push(piece);
                    }
                }
            }
            _ => segments.extend(split_by_punctuation(line)),
        }
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_punctuation_two_clauses() {
        let segments = segment(
            "这是一段测试文本。用于验证系统功能。",
            BreakingStandard::Punctuation,
            &SegmentParams::default(),
        )
        .unwrap();

        assert_eq!(segments, vec!["这是一段测试文本。", "用于验证系统功能。"]);
    }

    #[test]
    fn test_char_count_chunks() {
        let params = SegmentParams::default().with_char_count(5);
        let segments = segment("一二三四五六七八九十甲乙", BreakingStandard::CharCount, &params).unwrap();

        let lengths: Vec<usize> = segments.iter().map(|s| s.chars().count()).collect();
        assert_eq!(lengths, vec![5, 5, 2]);
        assert_eq!(segments.concat(), "一二三四五六七八九十甲乙");
    }

    #[test]
    fn test_lines_are_separators() {
        let segments = segment(
            "第一行没有标点\n\n  第二行。第三句！",
            BreakingStandard::Punctuation,
            &SegmentParams::default(),
        )
        .unwrap();

        assert_eq!(segments, vec!["第一行没有标点", "第二行。", "第三句！"]);
    }

    #[test]
    fn test_consecutive_delimiters_stay_together() {
        let segments = segment(
            "真的吗？！当然……走吧。",
            BreakingStandard::Punctuation,
            &SegmentParams::default(),
        )
        .unwrap();

        assert_eq!(segments, vec!["真的吗？！", "当然……", "走吧。"]);
    }

    #[test]
    fn test_closing_quote_attached_to_previous() {
        let segments = segment(
            "他说：\u{201C}好的。\u{201D}然后离开了。",
            BreakingStandard::Punctuation,
            &SegmentParams::default(),
        )
        .unwrap();

        assert_eq!(segments.len(), 2);
        assert!(segments[0].ends_with('\u{201D}'));
    }

    #[test]
    fn test_hybrid_splits_long_sentences_only() {
        let params = SegmentParams::default().with_char_count(4);
        let segments = segment("短句。这一句明显比较长。", BreakingStandard::Hybrid, &params).unwrap();

        assert_eq!(segments[0], "短句。");
        assert!(segments[1..].iter().all(|s| s.chars().count() <= 4));
        assert_eq!(segments.concat(), "短句。这一句明显比较长。");
    }

    #[test]
    fn test_coverage_is_preserved() {
        let text = "  开头有空白。中间，有逗号！\n结尾 没有标点  ";
        for standard in BreakingStandard::ALL {
            let params = SegmentParams::default().with_char_count(3);
            let segments = segment(text, standard, &params).unwrap();
            assert_eq!(
                strip_whitespace(&segments.concat()),
                strip_whitespace(text),
                "standard {:?}",
                standard
            );
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "甲乙丙。丁戊己庚辛！壬癸";
        let params = SegmentParams::default().with_char_count(2);
        let first = segment(text, BreakingStandard::Hybrid, &params).unwrap();
        let second = segment(text, BreakingStandard::Hybrid, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_text_rejected() {
        let result = segment("  \n\t ", BreakingStandard::Punctuation, &SegmentParams::default());
        assert_eq!(result, Err(SegmentError::Empty));
    }

    #[test]
    fn test_too_long_rejected() {
        let params = SegmentParams {
            char_count: None,
            max_text_chars: 5,
        };
        let result = segment("一二三四五六", BreakingStandard::Punctuation, &params);
        assert_eq!(result, Err(SegmentError::TooLong { limit: 5, actual: 6 }));
    }

    #[test]
    fn test_char_count_required() {
        let result = segment("内容", BreakingStandard::CharCount, &SegmentParams::default());
        assert!(matches!(result, Err(SegmentError::MissingCharCount(_))));

        let params = SegmentParams::default().with_char_count(0);
        let result = segment("内容", BreakingStandard::Hybrid, &params);
        assert!(matches!(result, Err(SegmentError::MissingCharCount(_))));
    }

    #[test]
    fn test_standard_ids_round_trip() {
        for standard in BreakingStandard::ALL {
            assert_eq!(BreakingStandard::from_id(standard.id()), Ok(standard));
            assert_eq!(BreakingStandard::from_str(standard.as_str()), Some(standard));
        }
        assert_eq!(BreakingStandard::from_id(9), Err(SegmentError::UnknownStandard(9)));
    }
}
