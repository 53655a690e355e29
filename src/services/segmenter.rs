//! 分段状态机 - 业务能力层
//!
//! 把行分类结果组装成题目记录：`Idle → BuildingQuestion → BuildingAnswers`。
//! 选项按位置槽存放（最多 5 个），以便正确答案标记按字母提前占位；
//! 输出时丢弃空槽并重新按 A、B、C… 编号。

use crate::models::dialect::Dialect;
use crate::models::line::{LineToken, TokenKind};
use crate::models::question::{
    clean_text, index_of, letter_for, AnswerOption, Provenance, QuestionRecord, MAX_ANSWERS,
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// 分段统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    /// 处理的行数
    pub lines: usize,
    /// 因没有选项被丢弃的片段
    pub dropped_fragments: usize,
    /// 超过 5 个而被忽略的选项
    pub overflow_options: usize,
    /// 题号重复而被重新编号的题目
    pub renumbered: usize,
    /// 五个选项都已有正文后忽略的续行
    pub ignored_lines: usize,
}

/// 分段结果
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pub records: Vec<QuestionRecord>,
    pub stats: SegmentStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    BuildingQuestion,
    BuildingAnswers,
}

/// 选项槽：声明时的字母（没有字母时按位置补）和正文
#[derive(Debug, Clone)]
struct Slot {
    letter: Option<char>,
    text: String,
}

impl Slot {
    fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// 正确答案指向：勾选框直接指向槽，文字标记指向字母
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pointer {
    Slot(usize),
    Letter(char),
}

/// 正在组装的题目
#[derive(Debug, Default)]
struct OpenQuestion {
    number: Option<u32>,
    text: String,
    slots: Vec<Slot>,
    last_slot: Option<usize>,
    correct: Option<Pointer>,
}

impl OpenQuestion {
    fn new(number: Option<u32>, text: &str) -> Self {
        Self {
            number,
            text: text.to_string(),
            ..Default::default()
        }
    }

    fn has_answers(&self) -> bool {
        self.slots.iter().any(|s| !s.is_empty())
    }

    /// 追加一个槽；没有字母时用位置字母
    fn push_slot(&mut self, letter: Option<char>, text: &str) -> Option<usize> {
        if self.slots.len() >= MAX_ANSWERS {
            return None;
        }
        let letter = letter.or_else(|| letter_for(self.slots.len()));
        self.slots.push(Slot {
            letter,
            text: text.to_string(),
        });
        let idx = self.slots.len() - 1;
        self.last_slot = Some(idx);
        Some(idx)
    }

    fn find_slot(&self, letter: char) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.letter == Some(letter) && !s.is_empty())
            .or_else(|| self.slots.iter().position(|s| s.letter == Some(letter)))
    }

    fn find_empty_slot(&self, letter: char) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.letter == Some(letter) && s.is_empty())
    }

    fn correct_slot(&self) -> Option<usize> {
        match self.correct? {
            Pointer::Slot(idx) => Some(idx),
            Pointer::Letter(letter) => self.find_slot(letter),
        }
    }

    fn detected_letter(&self) -> Option<char> {
        match self.correct? {
            Pointer::Slot(idx) => self.slots.get(idx).and_then(|s| s.letter),
            Pointer::Letter(letter) => Some(letter),
        }
    }

    fn is_terminated(&self, terminators: &[String]) -> bool {
        let text = self.text.trim_end();
        if text.is_empty() {
            return false;
        }
        if terminators.is_empty() {
            return true;
        }
        let upper = text.to_uppercase();
        terminators
            .iter()
            .any(|t| upper.ends_with(&t.to_uppercase()))
    }
}

fn append(target: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

/// 分段器
#[derive(Debug, Clone)]
pub struct Segmenter {
    id_seed: u32,
    implicit_options: bool,
    question_terminators: Vec<String>,
}

impl Segmenter {
    pub fn new(dialect: &Dialect) -> Self {
        Self {
            id_seed: dialect.id_seed,
            implicit_options: dialect.implicit_options,
            question_terminators: dialect.question_terminators.clone(),
        }
    }

    /// 把一个来源的行分类结果组装成题目记录
    pub fn segment<I>(&self, tokens: I, source_file: &str) -> Segmentation
    where
        I: IntoIterator<Item = LineToken>,
    {
        let mut run = Run::new(self, source_file);
        for token in tokens {
            run.stats.lines += 1;
            run.feed(token);
        }
        run.flush();
        Segmentation {
            records: run.records,
            stats: run.stats,
        }
    }
}

/// 单次分段的可变状态
struct Run<'a> {
    segmenter: &'a Segmenter,
    source_file: &'a str,
    state: State,
    open: Option<OpenQuestion>,
    records: Vec<QuestionRecord>,
    used_ids: HashSet<u32>,
    last_id: Option<u32>,
    max_id: u32,
    stats: SegmentStats,
}

impl<'a> Run<'a> {
    fn new(segmenter: &'a Segmenter, source_file: &'a str) -> Self {
        Self {
            segmenter,
            source_file,
            state: State::Idle,
            open: None,
            records: Vec::new(),
            used_ids: HashSet::new(),
            last_id: None,
            max_id: 0,
            stats: SegmentStats::default(),
        }
    }

    fn feed(&mut self, token: LineToken) {
        match token.kind {
            TokenKind::QuestionStart => self.on_question_start(token),
            TokenKind::AnswerOption => self.on_answer(token),
            TokenKind::CorrectnessMarker => self.on_marker(token),
            TokenKind::Continuation => self.on_continuation(&token.payload),
            TokenKind::SectionSeparator | TokenKind::PageMarker => self.flush(),
            TokenKind::Noise => {}
        }
    }

    fn on_question_start(&mut self, token: LineToken) {
        if self.state == State::BuildingQuestion {
            if let Some(open) = self.open.as_mut() {
                // 标题行之后紧跟题干行：合并
                if open.text.trim().is_empty() {
                    if token.sequence_hint.is_some() {
                        open.number = token.sequence_hint;
                    }
                    open.text = token.payload;
                    return;
                }
            }
        }
        self.flush();
        self.open = Some(OpenQuestion::new(token.sequence_hint, &token.payload));
        self.state = State::BuildingQuestion;
    }

    fn on_answer(&mut self, token: LineToken) {
        let Some(open) = self.open.as_mut() else {
            return;
        };

        let prefilled = token.letter.and_then(|l| open.find_empty_slot(l));
        let slot = match prefilled {
            Some(idx) => {
                open.slots[idx].text = token.payload;
                open.last_slot = Some(idx);
                idx
            }
            None => match open.push_slot(token.letter, &token.payload) {
                Some(idx) => idx,
                None => {
                    self.stats.overflow_options += 1;
                    debug!("忽略第 6 个及以后的选项: {}", token.payload);
                    return;
                }
            },
        };

        if token.marks_correct {
            open.correct = Some(Pointer::Slot(slot));
        }
        self.state = State::BuildingAnswers;
    }

    fn on_marker(&mut self, token: LineToken) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        // 不带字母的公告只影响下一行的分类
        let Some(letter) = token.letter else {
            return;
        };
        open.correct = Some(Pointer::Letter(letter));

        if token.payload.trim().is_empty() {
            return;
        }
        // 带正文的标记同时是该字母的选项：按位置补齐空槽后占位
        let target = match open.find_slot(letter) {
            Some(idx) => Some(idx),
            None => {
                if let Some(pos) = index_of(letter) {
                    while open.slots.len() < pos {
                        open.push_slot(None, "");
                    }
                }
                open.push_slot(Some(letter), "")
            }
        };
        match target {
            Some(idx) => {
                if open.slots[idx].is_empty() {
                    open.slots[idx].text = token.payload;
                }
                open.last_slot = Some(idx);
                self.state = State::BuildingAnswers;
            }
            None => self.stats.overflow_options += 1,
        }
    }

    fn on_continuation(&mut self, text: &str) {
        let segmenter = self.segmenter;
        let Some(open) = self.open.as_mut() else {
            return;
        };

        match self.state {
            State::Idle => {}
            State::BuildingQuestion => {
                let opens_slot = segmenter.implicit_options
                    && open.is_terminated(&segmenter.question_terminators);
                if opens_slot && open.push_slot(None, text).is_some() {
                    self.state = State::BuildingAnswers;
                } else {
                    append(&mut open.text, text);
                }
            }
            State::BuildingAnswers => {
                // 单独字母之后的一行是它的正文
                let pending = open.last_slot.filter(|&idx| open.slots[idx].is_empty());
                if pending.is_none() && open.slots.len() >= MAX_ANSWERS {
                    self.stats.ignored_lines += 1;
                    debug!("选项已满，忽略续行: {}", text);
                    return;
                }
                let opened = pending.is_none()
                    && segmenter.implicit_options
                    && open.push_slot(None, text).is_some();
                if !opened {
                    if let Some(idx) = pending.or(open.last_slot) {
                        append(&mut open.slots[idx].text, text);
                    }
                }
            }
        }
    }

    /// 输出当前题目（有选项时），然后回到 Idle
    fn flush(&mut self) {
        self.state = State::Idle;
        let Some(open) = self.open.take() else {
            return;
        };

        let question = clean_text(&open.text);
        if question.is_empty() || !open.has_answers() {
            self.stats.dropped_fragments += 1;
            debug!(
                "丢弃没有选项的片段 (题号 {:?}): {}",
                open.number,
                crate::utils::logging::truncate_text(&question, 60)
            );
            return;
        }

        let correct_slot = open.correct_slot();
        let mut answers = Vec::with_capacity(open.slots.len());
        let mut correct_answer = None;
        for (slot_idx, slot) in open.slots.iter().enumerate() {
            let text = clean_text(&slot.text);
            if text.is_empty() {
                continue;
            }
            let Some(letter) = letter_for(answers.len()) else {
                break;
            };
            if correct_slot == Some(slot_idx) {
                correct_answer = Some(letter);
            }
            answers.push(AnswerOption { letter, text });
        }

        // 标记指向的槽没有内容：无法映射
        let detected_answer = match correct_answer {
            None => open.detected_letter(),
            Some(_) => None,
        };

        let id = self.assign_id(open.number);
        self.records.push(QuestionRecord {
            id,
            question,
            category: String::new(),
            subcategory: None,
            answers,
            correct_answer,
            provenance: Provenance {
                source_file: self.source_file.to_string(),
                detected_answer,
            },
        });
    }

    fn assign_id(&mut self, declared: Option<u32>) -> u32 {
        let candidate = match (declared, self.last_id) {
            (Some(n), _) => n,
            (None, Some(prev)) => prev.saturating_add(1),
            (None, None) => self.segmenter.id_seed,
        };
        let id = if self.used_ids.contains(&candidate) {
            let replacement = self.max_id.saturating_add(1);
            warn!(
                "[{}] 题号 {} 重复，改为 {}",
                self.source_file, candidate, replacement
            );
            self.stats.renumbered += 1;
            replacement
        } else {
            candidate
        };
        self.used_ids.insert(id);
        self.max_id = self.max_id.max(id);
        self.last_id = Some(id);
        id
    }
}
