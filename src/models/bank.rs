//! 题库与输出文件的数据结构

use crate::models::question::QuestionRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 类别计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

/// 一个来源分类完成后的全部记录
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedSource {
    pub name: String,
    pub records: Vec<QuestionRecord>,
}

impl ClassifiedSource {
    pub fn new(name: impl Into<String>, records: Vec<QuestionRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

/// 被吸收的重复记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsorbedRecord {
    pub source: String,
    pub id: u32,
    pub fingerprint: String,
    pub duplicate_of_source: String,
    pub duplicate_of_id: u32,
}

/// 题库中的一条保留记录及其吸收的重复项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankEntry {
    pub fingerprint: String,
    pub source: String,
    pub record: QuestionRecord,
    pub absorbed: Vec<AbsorbedRecord>,
}

/// 单个来源的去重统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub source: String,
    pub total: usize,
    pub unique: usize,
    pub absorbed: usize,
    pub skipped: usize,
}

/// 去重后的题库，按插入顺序保存
#[derive(Debug, Clone, Default)]
pub struct QuizBank {
    entries: Vec<BankEntry>,
    index: HashMap<String, usize>,
    stats: Vec<SourceStats>,
}

impl QuizBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &str) -> Option<&BankEntry> {
        self.index.get(fingerprint).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.index.contains_key(fingerprint)
    }

    /// 新指纹加入题库；已存在时返回 false，不覆盖
    pub(crate) fn insert(&mut self, fingerprint: String, source: &str, record: QuestionRecord) -> bool {
        if self.index.contains_key(&fingerprint) {
            return false;
        }
        self.index.insert(fingerprint.clone(), self.entries.len());
        self.entries.push(BankEntry {
            fingerprint,
            source: source.to_string(),
            record,
            absorbed: Vec::new(),
        });
        true
    }

    /// 记录一条被保留记录吸收的重复项
    pub(crate) fn absorb(&mut self, fingerprint: &str, source: &str, id: u32) -> Option<&AbsorbedRecord> {
        let &i = self.index.get(fingerprint)?;
        let entry = &mut self.entries[i];
        entry.absorbed.push(AbsorbedRecord {
            source: source.to_string(),
            id,
            fingerprint: fingerprint.to_string(),
            duplicate_of_source: entry.source.clone(),
            duplicate_of_id: entry.record.id,
        });
        entry.absorbed.last()
    }

    pub(crate) fn push_stats(&mut self, stats: SourceStats) {
        self.stats.push(stats);
    }

    pub fn entries(&self) -> &[BankEntry] {
        &self.entries
    }

    /// 保留下来的记录
    pub fn survivors(&self) -> impl Iterator<Item = &QuestionRecord> {
        self.entries.iter().map(|e| &e.record)
    }

    /// 全部被吸收的记录（按保留记录顺序展开）
    pub fn absorbed(&self) -> Vec<AbsorbedRecord> {
        self.entries
            .iter()
            .flat_map(|e| e.absorbed.iter().cloned())
            .collect()
    }

    pub fn total_absorbed(&self) -> usize {
        self.entries.iter().map(|e| e.absorbed.len()).sum()
    }

    pub fn stats(&self) -> &[SourceStats] {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 比较报告中已有的匹配记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingMatch {
    pub id: u32,
    pub question: String,
    pub category: String,
    pub source: String,
}

/// 候选来源中的重复题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub id: u32,
    pub question: String,
    pub category: String,
    pub existing_matches: Vec<ExistingMatch>,
}

/// 一个来源与其他来源的比较报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub source: String,
    /// 各来源的记录数
    pub totals: BTreeMap<String, usize>,
    pub duplicates: Vec<DuplicateMatch>,
    pub unique: Vec<QuestionRecord>,
}

/// 输出文件的元数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankMetadata {
    pub source_file: String,
    pub extraction_date: String,
    pub total_quizzes: usize,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub needs_verification: usize,
    #[serde(default)]
    pub dropped_fragments: usize,
    #[serde(default)]
    pub category_distribution: Vec<CategoryCount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceStats>,
}

/// 输出文件：`{ metadata, quizzes }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankArtifact {
    pub metadata: BankMetadata,
    pub quizzes: Vec<QuestionRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicates: Vec<AbsorbedRecord>,
}
