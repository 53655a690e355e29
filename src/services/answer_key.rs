//! 答案表覆盖 - 业务能力层
//!
//! 正确答案的来源优先级：外部答案表 > 文本中的标记 > 无（需人工核对）。

use crate::error::AppResult;
use crate::models::question::{normalize_letter, QuestionRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 外部答案表：题号 -> 正确字母
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectAnswerMap {
    entries: HashMap<u32, char>,
}

/// 答案表文件的两种形状：扁平的 `{"42": "C"}`，或包一层 `correctAnswers`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AnswerKeyFile {
    Wrapped {
        #[serde(rename = "correctAnswers")]
        correct_answers: HashMap<String, String>,
    },
    Flat(HashMap<String, String>),
}

impl CorrectAnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 JSON 答案表，非法条目跳过并告警
    pub fn from_json_str(content: &str) -> AppResult<Self> {
        let raw = match serde_json::from_str::<AnswerKeyFile>(content)? {
            AnswerKeyFile::Wrapped { correct_answers } => correct_answers,
            AnswerKeyFile::Flat(entries) => entries,
        };

        let mut map = Self::new();
        for (key, value) in raw {
            let Ok(id) = key.trim().parse::<u32>() else {
                warn!("答案表题号无效，已跳过: {}", key);
                continue;
            };
            let mut chars = value.trim().chars();
            let letter = match (chars.next(), chars.next()) {
                (Some(c), None) => normalize_letter(c),
                _ => None,
            };
            match letter {
                Some(letter) => map.insert(id, letter),
                None => warn!("答案表中题目 {} 的字母无效，已跳过: {}", id, value),
            }
        }
        Ok(map)
    }

    pub fn insert(&mut self, id: u32, letter: char) {
        if let Some(letter) = normalize_letter(letter) {
            self.entries.insert(id, letter);
        }
    }

    pub fn get(&self, id: u32) -> Option<char> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(u32, char)> for CorrectAnswerMap {
    fn from_iter<T: IntoIterator<Item = (u32, char)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (id, letter) in iter {
            map.insert(id, letter);
        }
        map
    }
}

/// 正确答案的最终来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerResolution {
    /// 来自答案表
    AnswerKey,
    /// 来自文本标记
    Marker,
    /// 无法确定，需要人工核对
    Unresolved,
}

/// 覆盖统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayStats {
    pub from_key: usize,
    pub from_marker: usize,
    pub unresolved: usize,
    /// 答案表与文本标记不一致的题目
    pub overridden: usize,
}

impl OverlayStats {
    fn count(&mut self, resolution: AnswerResolution) {
        match resolution {
            AnswerResolution::AnswerKey => self.from_key += 1,
            AnswerResolution::Marker => self.from_marker += 1,
            AnswerResolution::Unresolved => self.unresolved += 1,
        }
    }
}

/// 对单条记录应用答案表
///
/// 答案表与文本标记不一致时，文本标记保留在 `provenance.detected_answer`。
pub fn overlay(record: &mut QuestionRecord, key: Option<&CorrectAnswerMap>) -> AnswerResolution {
    if let Some(letter) = key.and_then(|k| k.get(record.id)) {
        if let Some(detected) = record.correct_answer {
            if detected != letter {
                debug!(
                    "题目 {} 答案表 {} 覆盖文本标记 {}",
                    record.id, letter, detected
                );
                record.provenance.detected_answer = Some(detected);
            }
        }
        record.correct_answer = Some(letter);
        if !record.has_resolved_answer() {
            warn!(
                "题目 {} 答案表给出 {}，但只有 {} 个选项",
                record.id,
                letter,
                record.answers.len()
            );
            return AnswerResolution::Unresolved;
        }
        return AnswerResolution::AnswerKey;
    }

    match record.correct_answer {
        Some(_) => AnswerResolution::Marker,
        None => AnswerResolution::Unresolved,
    }
}

/// 对一个来源的全部记录应用答案表
pub fn overlay_all(records: &mut [QuestionRecord], key: Option<&CorrectAnswerMap>) -> OverlayStats {
    let mut stats = OverlayStats::default();
    for record in records.iter_mut() {
        let before = record.correct_answer;
        let resolution = overlay(record, key);
        if resolution == AnswerResolution::AnswerKey && before.is_some() && before != record.correct_answer {
            stats.overridden += 1;
        }
        stats.count(resolution);
    }
    stats
}
