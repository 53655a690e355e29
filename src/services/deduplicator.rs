//! 跨来源去重 - 业务能力层
//!
//! 以规范化题干的指纹作为相等键，按来源优先级先到先得。
//! 低优先级来源中的重复项只记入审计列表，从不覆盖已保留的记录。

use crate::models::bank::{
    ClassifiedSource, ComparisonReport, DuplicateMatch, ExistingMatch, QuizBank, SourceStats,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// 指纹长度（字符数）
pub const FINGERPRINT_LEN: usize = 150;

/// 题干指纹：去首尾空白、转小写、去标点、压缩空白，取前 150 个字符
pub fn fingerprint(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(FINGERPRINT_LEN)
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// 去重器
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    priority: Vec<String>,
}

impl Deduplicator {
    /// `priority` 为来源名称，越靠前优先级越高
    pub fn new(priority: Vec<String>) -> Self {
        Self { priority }
    }

    /// 按优先级排序；未列出的来源按输入顺序排在最后
    pub fn order<'a>(&self, sources: &'a [ClassifiedSource]) -> Vec<&'a ClassifiedSource> {
        let mut ordered: Vec<&ClassifiedSource> = sources.iter().collect();
        ordered.sort_by_key(|s| {
            self.priority
                .iter()
                .position(|p| p == &s.name)
                .unwrap_or(usize::MAX)
        });
        ordered
    }

    /// 合并多个来源
    pub fn merge(&self, sources: &[ClassifiedSource]) -> QuizBank {
        let mut bank = QuizBank::new();

        for source in self.order(sources) {
            let mut stats = SourceStats {
                source: source.name.clone(),
                total: source.records.len(),
                ..Default::default()
            };

            for record in &source.records {
                let key = fingerprint(&record.question);
                if key.is_empty() {
                    stats.skipped += 1;
                    continue;
                }
                if bank.insert(key.clone(), &source.name, record.clone()) {
                    stats.unique += 1;
                } else if let Some(absorbed) = bank.absorb(&key, &source.name, record.id) {
                    debug!(
                        "[{}] 题目 {} 与 [{}] 题目 {} 重复",
                        source.name, record.id, absorbed.duplicate_of_source, absorbed.duplicate_of_id
                    );
                    stats.absorbed += 1;
                }
            }

            info!(
                "[{}] 去重: 共 {} 题，保留 {}，重复 {}，跳过 {}",
                stats.source, stats.total, stats.unique, stats.absorbed, stats.skipped
            );
            bank.push_stats(stats);
        }

        bank
    }

    /// 比较一个候选来源与已有来源
    pub fn compare(existing: &[ClassifiedSource], candidate: &ClassifiedSource) -> ComparisonReport {
        let mut totals = BTreeMap::new();
        let mut index: HashMap<String, Vec<ExistingMatch>> = HashMap::new();

        for source in existing {
            totals.insert(source.name.clone(), source.records.len());
            for record in &source.records {
                let key = fingerprint(&record.question);
                if key.is_empty() {
                    continue;
                }
                index.entry(key).or_default().push(ExistingMatch {
                    id: record.id,
                    question: truncate(&record.question, FINGERPRINT_LEN),
                    category: record.category.clone(),
                    source: source.name.clone(),
                });
            }
        }
        totals.insert(candidate.name.clone(), candidate.records.len());

        let mut duplicates = Vec::new();
        let mut unique = Vec::new();
        for record in &candidate.records {
            match index.get(&fingerprint(&record.question)) {
                Some(matches) => duplicates.push(DuplicateMatch {
                    id: record.id,
                    question: truncate(&record.question, FINGERPRINT_LEN),
                    category: record.category.clone(),
                    existing_matches: matches.clone(),
                }),
                None => unique.push(record.clone()),
            }
        }

        info!(
            "[{}] 比较: {} 题重复，{} 题独有",
            candidate.name,
            duplicates.len(),
            unique.len()
        );

        ComparisonReport {
            source: candidate.name.clone(),
            totals,
            duplicates,
            unique,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{AnswerOption, Provenance, QuestionRecord};

    fn record(id: u32, question: &str, source_file: &str) -> QuestionRecord {
        QuestionRecord {
            id,
            question: question.to_string(),
            category: "FARMACOLOGIA".to_string(),
            subcategory: None,
            answers: vec![AnswerOption {
                letter: 'A',
                text: "x".to_string(),
            }],
            correct_answer: Some('A'),
            provenance: Provenance {
                source_file: source_file.to_string(),
                detected_answer: None,
            },
        }
    }

    fn source(name: &str, questions: &[(u32, &str)]) -> ClassifiedSource {
        ClassifiedSource::new(
            name,
            questions
                .iter()
                .map(|(id, q)| record(*id, q, &format!("{}.pdf", name)))
                .collect(),
        )
    }

    #[test]
    fn test_fingerprint_normalization() {
        assert_eq!(
            fingerprint("  What receptor does X block?  "),
            "what receptor does x block"
        );
        assert_eq!(
            fingerprint("What  receptor,\tdoes X block?"),
            fingerprint("what receptor does x BLOCK")
        );
        assert_eq!(fingerprint("?!..."), "");
        assert_eq!(fingerprint("Perché l'acido è più forte?"), "perché lacido è più forte");
    }

    #[test]
    fn test_fingerprint_is_bounded() {
        let base = "a".repeat(FINGERPRINT_LEN);
        let longer = format!("{} coda diversa", base);
        assert_eq!(fingerprint(&base), fingerprint(&longer));
        assert_eq!(fingerprint(&longer).chars().count(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_fingerprint_symmetric_equality() {
        let a = "Quale FANS è selettivo per COX-2?";
        let b = "quale fans è selettivo per cox2";
        assert_eq!(fingerprint(a) == fingerprint(b), fingerprint(b) == fingerprint(a));
        assert_eq!(fingerprint(a), fingerprint(a));
    }

    #[test]
    fn test_priority_source_wins() {
        let a = source("A", &[(7, "What receptor does X block?")]);
        let b = source("B", &[(90, "what receptor does x block")]);
        let dedup = Deduplicator::new(vec!["A".to_string(), "B".to_string()]);

        // 输入顺序与优先级相反
        let bank = dedup.merge(&[b, a]);
        assert_eq!(bank.len(), 1);
        let entry = &bank.entries()[0];
        assert_eq!(entry.source, "A");
        assert_eq!(entry.record.id, 7);
        assert_eq!(entry.absorbed.len(), 1);
        assert_eq!(entry.absorbed[0].source, "B");
        assert_eq!(entry.absorbed[0].id, 90);
        assert_eq!(entry.absorbed[0].duplicate_of_id, 7);
    }

    #[test]
    fn test_unlisted_sources_follow_input_order() {
        let sources = vec![
            source("C", &[(1, "uno")]),
            source("A", &[(1, "due")]),
            source("D", &[(1, "tre")]),
        ];
        let dedup = Deduplicator::new(vec!["A".to_string()]);
        let names: Vec<&str> = dedup.order(&sources).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C", "D"]);
    }

    #[test]
    fn test_stats_and_skipped() {
        let a = source("A", &[(1, "Domanda uno?"), (2, "Domanda due?"), (3, "???")]);
        let b = source("B", &[(1, "domanda UNO"), (2, "Domanda tre?")]);
        let bank = Deduplicator::new(vec![]).merge(&[a, b]);

        assert_eq!(bank.len(), 3);
        assert_eq!(bank.total_absorbed(), 1);
        let stats = bank.stats();
        assert_eq!(stats[0].total, 3);
        assert_eq!(stats[0].unique, 2);
        assert_eq!(stats[0].skipped, 1);
        assert_eq!(stats[1].unique, 1);
        assert_eq!(stats[1].absorbed, 1);
    }

    #[test]
    fn test_within_source_duplicates_are_absorbed() {
        let a = source("A", &[(1, "Stessa domanda?"), (2, "stessa domanda")]);
        let bank = Deduplicator::new(vec![]).merge(&[a]);
        assert_eq!(bank.len(), 1);
        assert_eq!(bank.entries()[0].absorbed[0].id, 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = source("A", &[(1, "Uno?"), (2, "Due?"), (3, "uno")]);
        let b = source("B", &[(1, "Tre?"), (2, "DUE")]);
        let dedup = Deduplicator::new(vec!["A".to_string(), "B".to_string()]);
        let first = dedup.merge(&[a, b]);

        let survivors = ClassifiedSource::new("merged", first.survivors().cloned().collect());
        let second = dedup.merge(&[survivors]);
        assert_eq!(second.total_absorbed(), 0);
        assert_eq!(second.len(), first.len());
    }

    #[test]
    fn test_merge_is_deterministic() {
        let make = || {
            vec![
                source("A", &[(1, "Uno?"), (2, "Due?")]),
                source("B", &[(5, "uno"), (6, "Quattro?")]),
            ]
        };
        let dedup = Deduplicator::new(vec!["B".to_string()]);
        let x: Vec<u32> = dedup.merge(&make()).survivors().map(|r| r.id).collect();
        let y: Vec<u32> = dedup.merge(&make()).survivors().map(|r| r.id).collect();
        assert_eq!(x, y);
        assert_eq!(x, vec![5, 6, 2]);
    }

    #[test]
    fn test_compare_report() {
        let a = source("A", &[(1, "Uno?"), (2, "Due?")]);
        let b = source("B", &[(9, "uno")]);
        let candidate = source("C", &[(3, "UNO!"), (4, "Cinque?")]);
        let report = Deduplicator::compare(&[a, b], &candidate);

        assert_eq!(report.source, "C");
        assert_eq!(report.totals.get("A"), Some(&2));
        assert_eq!(report.totals.get("C"), Some(&2));
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].id, 3);
        assert_eq!(report.duplicates[0].existing_matches.len(), 2);
        assert_eq!(report.unique.len(), 1);
        assert_eq!(report.unique[0].id, 4);
    }
}
