use serde::{Deserialize, Serialize};

/// 原始文本行（已去除首尾空白，空行已丢弃）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub text: String,
    /// 在原文中的行号（从0开始，含空行）
    pub source_line_index: usize,
}

impl RawLine {
    pub fn new(text: impl Into<String>, source_line_index: usize) -> Self {
        Self {
            text: text.into(),
            source_line_index,
        }
    }

    /// 按换行切分文本，去除首尾空白并丢弃空行
    pub fn split(text: &str) -> Vec<RawLine> {
        text.lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(RawLine::new(trimmed, idx))
                }
            })
            .collect()
    }
}

/// 行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// 题目开始（题号、预览标记、标题行）
    QuestionStart,
    /// 选项行
    AnswerOption,
    /// 正确答案标记
    CorrectnessMarker,
    /// 分节线
    SectionSeparator,
    /// 分页标记
    PageMarker,
    /// 续行
    Continuation,
    /// 噪声行（页码、散落字母等），不产生任何内容
    Noise,
}

/// 单行分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineToken {
    pub kind: TokenKind,
    pub payload: String,
    pub letter: Option<char>,
    pub sequence_hint: Option<u32>,
    /// 勾选框（✓ / ☑）标记的选项
    pub marks_correct: bool,
}

impl LineToken {
    pub fn new(kind: TokenKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            letter: None,
            sequence_hint: None,
            marks_correct: false,
        }
    }

    pub fn with_letter(mut self, letter: Option<char>) -> Self {
        self.letter = letter.map(|l| l.to_ascii_uppercase());
        self
    }

    pub fn with_sequence_hint(mut self, hint: Option<u32>) -> Self {
        self.sequence_hint = hint;
        self
    }

    pub fn marking_correct(mut self, marked: bool) -> Self {
        self.marks_correct = marked;
        self
    }

    /// 单独一行的字母选项，正文在下一行
    pub fn is_bare_option(&self) -> bool {
        self.kind == TokenKind::AnswerOption && self.letter.is_some() && self.payload.is_empty()
    }

    /// 不带字母的答案公告（如 "Risposta esatta"），字母在下一行
    pub fn is_letterless_marker(&self) -> bool {
        self.kind == TokenKind::CorrectnessMarker && self.letter.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_discards_blank_lines() {
        let lines = RawLine::split("  1. Domanda  \r\n\n   \nA) Uno\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], RawLine::new("1. Domanda", 0));
        assert_eq!(lines[1], RawLine::new("A) Uno", 3));
    }

    #[test]
    fn test_token_helpers() {
        let bare = LineToken::new(TokenKind::AnswerOption, "").with_letter(Some('c'));
        assert_eq!(bare.letter, Some('C'));
        assert!(bare.is_bare_option());

        let announce = LineToken::new(TokenKind::CorrectnessMarker, "");
        assert!(announce.is_letterless_marker());
    }

    #[test]
    fn test_kind_names_in_toml() {
        #[derive(Deserialize)]
        struct Probe {
            kinds: Vec<TokenKind>,
        }
        let probe: Probe = toml::from_str(r#"kinds = ["question_start", "page_marker"]"#).unwrap();
        assert_eq!(
            probe.kinds,
            vec![TokenKind::QuestionStart, TokenKind::PageMarker]
        );
    }
}
