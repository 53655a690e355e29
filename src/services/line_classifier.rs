//! 行分类服务 - 业务能力层
//!
//! 只负责"给一行文本定类型"，每行恰好产出一个 `LineToken`。
//! 规则按固定优先级匹配，先匹配者胜：
//!
//! 1. 题目开始
//! 2. 选项（显式规则、勾选框、OCR 字母映射、单独字母）
//! 3. 正确答案标记
//! 4. 分节线 / 分页标记
//! 5. 噪声 / 续行

use crate::error::{AppError, AppResult};
use crate::models::dialect::{Dialect, LineRule};
use crate::models::line::{LineToken, RawLine, TokenKind};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static CHECKBOX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<mark>[☐✓☑])\s*(?P<text>.*)$").expect("checkbox pattern"));

static BARE_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<letter>[A-Ea-e])$").expect("bare letter pattern"));

static DIGITS_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+$").expect("digits pattern"));

/// 编译后的规则
#[derive(Debug, Clone)]
struct CompiledRule {
    regex: Regex,
    unless: Option<Regex>,
    min_len: usize,
    not_after: Vec<TokenKind>,
}

impl CompiledRule {
    fn compile(dialect: &str, group: &str, index: usize, rule: &LineRule) -> AppResult<Self> {
        let name = format!("{}[{}]", group, index);
        let regex = Regex::new(&rule.pattern)
            .map_err(|e| AppError::invalid_pattern(dialect, name.clone(), e))?;
        let unless = match &rule.unless {
            Some(pattern) => Some(
                Regex::new(pattern)
                    .map_err(|e| AppError::invalid_pattern(dialect, format!("{}.unless", name), e))?,
            ),
            None => None,
        };
        Ok(Self {
            regex,
            unless,
            min_len: rule.min_len,
            not_after: rule.not_after.clone(),
        })
    }

    fn compile_all(dialect: &str, group: &str, rules: &[LineRule]) -> AppResult<Vec<Self>> {
        rules
            .iter()
            .enumerate()
            .map(|(i, rule)| Self::compile(dialect, group, i, rule))
            .collect()
    }

    fn captures<'t>(&self, text: &'t str, previous: Option<&LineToken>) -> Option<Captures<'t>> {
        if !self.not_after.is_empty() {
            if let Some(prev) = previous {
                // 上一行是等待正文的单独字母时，这一行属于该选项
                if self.not_after.contains(&prev.kind) || prev.is_bare_option() {
                    return None;
                }
            }
        }
        if text.chars().count() < self.min_len {
            return None;
        }
        if let Some(unless) = &self.unless {
            if unless.is_match(text) {
                return None;
            }
        }
        self.regex.captures(text)
    }
}

fn capture_str<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map(|m| m.as_str().trim()).unwrap_or("")
}

fn capture_letter(caps: &Captures<'_>) -> Option<char> {
    caps.name("letter")
        .and_then(|m| m.as_str().chars().next())
        .map(|c| c.to_ascii_uppercase())
}

fn capture_number(caps: &Captures<'_>) -> Option<u32> {
    if let Some(num) = caps.name("num") {
        return num.as_str().parse().ok();
    }
    let major: u32 = caps.name("major")?.as_str().parse().ok()?;
    let minor: u32 = caps.name("minor")?.as_str().parse().ok()?;
    major.checked_mul(100)?.checked_add(minor)
}

/// 行分类器
#[derive(Debug, Clone)]
pub struct LineClassifier {
    dialect: String,
    checkboxes: bool,
    bare_letter_options: bool,
    min_continuation_len: usize,
    skip: Vec<Regex>,
    question_start: Vec<CompiledRule>,
    answer: Vec<CompiledRule>,
    ocr_alias: Vec<(Regex, char)>,
    correct: Vec<CompiledRule>,
    announce: Vec<CompiledRule>,
    separator: Vec<CompiledRule>,
    page: Vec<CompiledRule>,
    noise: Vec<CompiledRule>,
}

impl LineClassifier {
    /// 编译方言规则表
    pub fn new(dialect: &Dialect) -> AppResult<Self> {
        let name = dialect.name.as_str();
        let skip = dialect
            .skip
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Regex::new(p).map_err(|e| AppError::invalid_pattern(name, format!("skip[{}]", i), e))
            })
            .collect::<AppResult<Vec<_>>>()?;
        let ocr_alias = dialect
            .ocr_alias
            .iter()
            .map(|alias| {
                let pattern = format!(r"^{}\s+(?P<text>.+)$", regex::escape(&alias.glyph));
                Regex::new(&pattern)
                    .map(|re| (re, alias.letter.to_ascii_uppercase()))
                    .map_err(|e| AppError::invalid_pattern(name, "ocr_alias", e))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            dialect: dialect.name.clone(),
            checkboxes: dialect.checkboxes,
            bare_letter_options: dialect.bare_letter_options,
            min_continuation_len: dialect.min_continuation_len,
            skip,
            question_start: CompiledRule::compile_all(name, "question_start", &dialect.question_start)?,
            answer: CompiledRule::compile_all(name, "answer", &dialect.answer)?,
            ocr_alias,
            correct: CompiledRule::compile_all(name, "correct", &dialect.correct)?,
            announce: CompiledRule::compile_all(name, "announce", &dialect.announce)?,
            separator: CompiledRule::compile_all(name, "separator", &dialect.separator)?,
            page: CompiledRule::compile_all(name, "page", &dialect.page)?,
            noise: CompiledRule::compile_all(name, "noise", &dialect.noise)?,
        })
    }

    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// 切行，并丢弃方言声明的整行跳过模式（如页眉横幅）
    pub fn raw_lines(&self, text: &str) -> Vec<RawLine> {
        RawLine::split(text)
            .into_iter()
            .filter(|line| !self.skip.iter().any(|re| re.is_match(&line.text)))
            .collect()
    }

    /// 对整段文本逐行分类
    pub fn tokenize(&self, text: &str) -> Vec<LineToken> {
        let mut tokens: Vec<LineToken> = Vec::new();
        for line in self.raw_lines(text) {
            let token = self.classify(&line, tokens.last());
            tokens.push(token);
        }
        tokens
    }

    /// 对单行分类
    ///
    /// `previous` 是上一行的分类结果，用于少数依赖上下文的规则。
    pub fn classify(&self, line: &RawLine, previous: Option<&LineToken>) -> LineToken {
        let text = line.text.trim();

        // 1. 题目开始
        for rule in &self.question_start {
            if let Some(caps) = rule.captures(text, previous) {
                return LineToken::new(TokenKind::QuestionStart, capture_str(&caps, "text"))
                    .with_sequence_hint(capture_number(&caps));
            }
        }

        // 单独字母的下一行是它的正文，除非是新的单独字母或正确答案
        if previous.map(|p| p.is_bare_option()).unwrap_or(false) {
            if let Some(caps) = BARE_LETTER.captures(text) {
                return LineToken::new(TokenKind::AnswerOption, "").with_letter(capture_letter(&caps));
            }
            if let Some(marker) = self.correctness_marker(text, previous) {
                return marker;
            }
            return LineToken::new(TokenKind::Continuation, text);
        }

        // 2. 选项
        for rule in &self.answer {
            if let Some(caps) = rule.captures(text, previous) {
                return LineToken::new(TokenKind::AnswerOption, capture_str(&caps, "text"))
                    .with_letter(capture_letter(&caps));
            }
        }

        if self.checkboxes {
            if let Some(caps) = CHECKBOX.captures(text) {
                let payload = capture_str(&caps, "text");
                if !payload.is_empty() {
                    let marked = capture_str(&caps, "mark") != "☐";
                    return LineToken::new(TokenKind::AnswerOption, payload).marking_correct(marked);
                }
            }
        }

        let after_answer = matches!(previous.map(|p| p.kind), Some(TokenKind::AnswerOption));
        if !after_answer {
            for (re, letter) in &self.ocr_alias {
                if let Some(caps) = re.captures(text) {
                    return LineToken::new(TokenKind::AnswerOption, capture_str(&caps, "text"))
                        .with_letter(Some(*letter));
                }
            }
        }

        if let Some(caps) = BARE_LETTER.captures(text) {
            // 公告下一行的字母在这里截住，否则会被当成单独字母选项
            if previous.map(|p| p.is_letterless_marker()).unwrap_or(false) {
                return LineToken::new(TokenKind::CorrectnessMarker, "")
                    .with_letter(capture_letter(&caps));
            }
            if self.bare_letter_options {
                return LineToken::new(TokenKind::AnswerOption, "").with_letter(capture_letter(&caps));
            }
        }

        // 3. 正确答案标记
        if let Some(marker) = self.correctness_marker(text, previous) {
            return marker;
        }

        // 4. 分节 / 分页
        if self.separator.iter().any(|r| r.captures(text, previous).is_some()) {
            return LineToken::new(TokenKind::SectionSeparator, "");
        }
        if self.page.iter().any(|r| r.captures(text, previous).is_some()) {
            return LineToken::new(TokenKind::PageMarker, "");
        }

        // 5. 噪声 / 续行
        if self.noise.iter().any(|r| r.captures(text, previous).is_some())
            || DIGITS_ONLY.is_match(text)
            || text.chars().count() < self.min_continuation_len
        {
            return LineToken::new(TokenKind::Noise, text);
        }

        LineToken::new(TokenKind::Continuation, text)
    }

    /// 带字母的标记 `Risposta X`，或不带字母的公告
    fn correctness_marker(&self, text: &str, previous: Option<&LineToken>) -> Option<LineToken> {
        for rule in &self.correct {
            if let Some(caps) = rule.captures(text, previous) {
                return Some(
                    LineToken::new(TokenKind::CorrectnessMarker, capture_str(&caps, "text"))
                        .with_letter(capture_letter(&caps)),
                );
            }
        }
        self.announce
            .iter()
            .any(|rule| rule.captures(text, previous).is_some())
            .then(|| LineToken::new(TokenKind::CorrectnessMarker, ""))
    }
}
