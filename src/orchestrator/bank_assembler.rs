//! 题库组装 - 编排层
//!
//! 把一个来源的处理结果或去重后的题库包装成 `{ metadata, quizzes }` 输出文件，
//! 并提供通用方言的文本导出（可被重新导入）。

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::bank::{BankArtifact, BankMetadata, QuizBank};
use crate::models::question::QuestionRecord;
use crate::services::category_distribution;
use crate::workflow::SourceOutcome;

/// 合并题库的 sourceFile
pub const MERGED_SOURCE_FILE: &str = "merged";

/// 通用方言 `N.` 题号的最大值，更大的题号导出为 `Domanda N:`
const MAX_SHORT_ID: u32 = 9999;

/// 缺少正确答案时的说明
pub fn verification_note(needs_verification: usize) -> Option<String> {
    (needs_verification > 0).then(|| {
        format!(
            "{} domande necessitano verifica manuale delle risposte corrette",
            needs_verification
        )
    })
}

/// 题库组装器，同一次运行内所有输出共用一个时间戳
#[derive(Debug, Clone)]
pub struct BankAssembler {
    timestamp: DateTime<Utc>,
}

impl BankAssembler {
    pub fn new() -> Self {
        Self::with_timestamp(Utc::now())
    }

    pub fn with_timestamp(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    fn extraction_date(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn metadata(&self, source_file: &str, quizzes: &[QuestionRecord]) -> BankMetadata {
        let needs_verification = quizzes.iter().filter(|r| !r.has_resolved_answer()).count();
        BankMetadata {
            source_file: source_file.to_string(),
            extraction_date: self.extraction_date(),
            total_quizzes: quizzes.len(),
            note: verification_note(needs_verification),
            needs_verification,
            dropped_fragments: 0,
            category_distribution: category_distribution(quizzes),
            sources: Vec::new(),
        }
    }

    /// 单个来源的输出文件
    pub fn source_artifact(&self, outcome: &SourceOutcome) -> BankArtifact {
        let mut metadata = self.metadata(&outcome.ctx.source_file, &outcome.records);
        metadata.dropped_fragments = outcome.segment_stats.dropped_fragments;
        BankArtifact {
            metadata,
            quizzes: outcome.records.clone(),
            duplicates: Vec::new(),
        }
    }

    /// 去重后的合并题库，附带每个来源的统计和被吸收记录
    pub fn merged_artifact(&self, bank: &QuizBank) -> BankArtifact {
        let quizzes: Vec<QuestionRecord> = bank.survivors().cloned().collect();
        let mut metadata = self.metadata(MERGED_SOURCE_FILE, &quizzes);
        metadata.sources = bank.stats().to_vec();
        BankArtifact {
            metadata,
            quizzes,
            duplicates: bank.absorbed(),
        }
    }

    /// 以通用方言导出文本：`N. 题干`、`A) 选项`、`Risposta X`、`---`
    pub fn render_source_text(records: &[QuestionRecord]) -> String {
        let mut out = String::new();
        for record in records {
            if record.id > MAX_SHORT_ID {
                out.push_str(&format!("Domanda {}: {}\n", record.id, record.question));
            } else {
                out.push_str(&format!("{}. {}\n", record.id, record.question));
            }
            for answer in &record.answers {
                out.push_str(&format!("{}) {}\n", answer.letter, answer.text));
            }
            if let Some(letter) = record.correct_answer {
                out.push_str(&format!("Risposta {}\n", letter));
            }
            out.push_str("---\n");
        }
        out
    }
}

impl Default for BankAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bank::ClassifiedSource;
    use crate::models::dialect::Dialect;
    use crate::models::question::{AnswerOption, Provenance};
    use crate::services::{Deduplicator, LineClassifier, OverlayStats, SegmentStats, Segmenter};
    use crate::workflow::SourceCtx;
    use chrono::TimeZone;

    fn record(id: u32, question: &str, correct: Option<char>) -> QuestionRecord {
        QuestionRecord {
            id,
            question: question.to_string(),
            category: "ALTRO".to_string(),
            subcategory: None,
            answers: vec![
                AnswerOption {
                    letter: 'A',
                    text: "Prima opzione".to_string(),
                },
                AnswerOption {
                    letter: 'B',
                    text: "Seconda opzione".to_string(),
                },
            ],
            correct_answer: correct,
            provenance: Provenance {
                source_file: "prova.pdf".to_string(),
                detected_answer: None,
            },
        }
    }

    fn assembler() -> BankAssembler {
        BankAssembler::with_timestamp(Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_source_artifact_note() {
        let outcome = SourceOutcome {
            ctx: SourceCtx::new(
                "prova".to_string(),
                1,
                "prova.pdf".to_string(),
                "generic".to_string(),
            ),
            records: vec![
                record(1, "Prima domanda?", Some('A')),
                record(2, "Seconda domanda?", None),
            ],
            segment_stats: SegmentStats {
                dropped_fragments: 3,
                ..Default::default()
            },
            overlay_stats: OverlayStats::default(),
        };

        let artifact = assembler().source_artifact(&outcome);
        assert_eq!(artifact.metadata.source_file, "prova.pdf");
        assert_eq!(artifact.metadata.extraction_date, "2025-03-01T08:30:00.000Z");
        assert_eq!(artifact.metadata.total_quizzes, 2);
        assert_eq!(artifact.metadata.dropped_fragments, 3);
        assert_eq!(
            artifact.metadata.note.as_deref(),
            Some("1 domande necessitano verifica manuale delle risposte corrette")
        );
    }

    #[test]
    fn test_no_note_when_all_resolved() {
        assert_eq!(verification_note(0), None);
    }

    #[test]
    fn test_merged_artifact() {
        let a = ClassifiedSource::new("a", vec![record(1, "Stessa domanda?", Some('A'))]);
        let b = ClassifiedSource::new(
            "b",
            vec![
                record(7, "stessa   domanda", None),
                record(8, "Un'altra domanda?", None),
            ],
        );
        let bank = Deduplicator::new(vec!["a".to_string()]).merge(&[a, b]);

        let artifact = assembler().merged_artifact(&bank);
        assert_eq!(artifact.metadata.source_file, MERGED_SOURCE_FILE);
        assert_eq!(artifact.metadata.total_quizzes, 2);
        assert_eq!(artifact.metadata.sources.len(), 2);
        assert_eq!(artifact.duplicates.len(), 1);
        assert_eq!(artifact.duplicates[0].id, 7);
    }

    #[test]
    fn test_render_round_trip() {
        let records = vec![
            record(1, "Prima domanda?", Some('B')),
            record(2, "Seconda domanda?", None),
        ];
        let text = BankAssembler::render_source_text(&records);

        let dialect = Dialect::builtin("generic").unwrap();
        let tokens = LineClassifier::new(&dialect).unwrap().tokenize(&text);
        let back = Segmenter::new(&dialect).segment(tokens, "prova.pdf").records;

        assert_eq!(back.len(), 2);
        for (original, parsed) in records.iter().zip(&back) {
            assert_eq!(parsed.id, original.id);
            assert_eq!(parsed.question, original.question);
            assert_eq!(parsed.answers, original.answers);
            assert_eq!(parsed.correct_answer, original.correct_answer);
        }
    }

    #[test]
    fn test_render_round_trip_large_ids() {
        let records = vec![
            record(12345, "Domanda lunga?", Some('A')),
            record(9999, "Ultimo numero breve?", None),
            record(120304, "Anteprima ad alto numero?", Some('B')),
        ];
        let text = BankAssembler::render_source_text(&records);
        assert!(text.starts_with("Domanda 12345: Domanda lunga?\n"));
        assert!(text.contains("9999. Ultimo numero breve?\n"));

        let dialect = Dialect::builtin("generic").unwrap();
        let tokens = LineClassifier::new(&dialect).unwrap().tokenize(&text);
        let back = Segmenter::new(&dialect).segment(tokens, "prova.pdf").records;

        let ids: Vec<u32> = back.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![12345, 9999, 120304]);
        for (original, parsed) in records.iter().zip(&back) {
            assert_eq!(parsed.question, original.question);
            assert_eq!(parsed.answers, original.answers);
            assert_eq!(parsed.correct_answer, original.correct_answer);
        }
    }
}
