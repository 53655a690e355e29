//! 来源处理流程 - 流程层
//!
//! 核心职责：定义"一个来源"的完整处理流程
//!
//! 流程顺序：
//! 1. 行分类（方言规则）
//! 2. 分段 → 题目记录
//! 3. 答案表覆盖
//! 4. 学科分类

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::dialect::Dialect;
use crate::models::question::QuestionRecord;
use crate::services::{
    overlay_all, CorrectAnswerMap, LineClassifier, OverlayStats, SegmentStats, Segmenter,
    SubjectClassifier,
};
use crate::utils::logging::truncate_text;
use crate::workflow::source_ctx::SourceCtx;

/// 一个来源的处理结果
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub ctx: SourceCtx,
    pub records: Vec<QuestionRecord>,
    pub segment_stats: SegmentStats,
    pub overlay_stats: OverlayStats,
}

impl SourceOutcome {
    /// 需要人工核对答案的题目数
    pub fn needs_verification(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !r.has_resolved_answer())
            .count()
    }
}

/// 来源处理流程
///
/// - 持有编译好的方言规则和共享的分类器
/// - 不做任何 IO，文本和答案表由编排层读入
pub struct SourceFlow {
    classifier: LineClassifier,
    segmenter: Segmenter,
    subjects: Arc<SubjectClassifier>,
    verbose_logging: bool,
}

impl SourceFlow {
    pub fn new(dialect: &Dialect, subjects: Arc<SubjectClassifier>) -> AppResult<Self> {
        Ok(Self {
            classifier: LineClassifier::new(dialect)?,
            segmenter: Segmenter::new(dialect),
            subjects,
            verbose_logging: false,
        })
    }

    pub fn verbose(mut self, verbose_logging: bool) -> Self {
        self.verbose_logging = verbose_logging;
        self
    }

    pub fn run(
        &self,
        ctx: SourceCtx,
        text: &str,
        answer_key: Option<&CorrectAnswerMap>,
    ) -> SourceOutcome {
        // ========== 步骤 1: 行分类 ==========
        let tokens = self.classifier.tokenize(text);
        debug!(
            "{} 按方言 {} 分类，共 {} 行有效文本",
            ctx,
            self.classifier.dialect(),
            tokens.len()
        );

        // ========== 步骤 2: 分段 ==========
        let segmentation = self.segmenter.segment(tokens, &ctx.source_file);
        let mut records = segmentation.records;
        let segment_stats = segmentation.stats;

        info!("{} ✓ 分段完成，得到 {} 道题目", ctx, records.len());
        if segment_stats.dropped_fragments > 0 {
            warn!(
                "{} ⚠️ 丢弃了 {} 个没有选项的片段",
                ctx, segment_stats.dropped_fragments
            );
        }
        if segment_stats.overflow_options > 0 {
            warn!(
                "{} ⚠️ 忽略了 {} 个超出 E 的选项",
                ctx, segment_stats.overflow_options
            );
        }
        if segment_stats.ignored_lines > 0 {
            warn!(
                "{} ⚠️ 忽略了 {} 行五个选项之后的文本",
                ctx, segment_stats.ignored_lines
            );
        }

        // ========== 步骤 3: 答案表覆盖 ==========
        let overlay_stats = overlay_all(&mut records, answer_key);
        info!(
            "{} 正确答案: 答案表 {}，文本标记 {}，待核对 {}",
            ctx, overlay_stats.from_key, overlay_stats.from_marker, overlay_stats.unresolved
        );
        if overlay_stats.overridden > 0 {
            info!(
                "{} 答案表覆盖了 {} 个不一致的文本标记",
                ctx, overlay_stats.overridden
            );
        }

        // ========== 步骤 4: 学科分类 ==========
        for record in records.iter_mut() {
            let classification = self.subjects.classify_record(record);
            if self.verbose_logging {
                debug!(
                    "{} 题目 {} → {} / {} (得分 {}) {}",
                    ctx,
                    record.id,
                    classification.category,
                    classification.subcategory.as_deref().unwrap_or("-"),
                    classification.score,
                    truncate_text(&record.question, 60)
                );
                let hits: Vec<String> = self
                    .subjects
                    .scores(&record.question, &record.answers_text())
                    .into_iter()
                    .filter(|(_, score)| *score > 0)
                    .map(|(name, score)| format!("{}={}", name, score))
                    .collect();
                debug!("{} 题目 {} 各类别得分: [{}]", ctx, record.id, hits.join(", "));
            }
        }

        SourceOutcome {
            ctx,
            records,
            segment_stats,
            overlay_stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::taxonomy::Taxonomy;

    fn flow(dialect: &str) -> SourceFlow {
        let dialect = Dialect::builtin(dialect).unwrap();
        let subjects = Arc::new(SubjectClassifier::new(Taxonomy::builtin().unwrap()));
        SourceFlow::new(&dialect, subjects).unwrap()
    }

    fn ctx() -> SourceCtx {
        SourceCtx::new(
            "prova".to_string(),
            1,
            "prova.pdf".to_string(),
            "generic".to_string(),
        )
    }

    #[test]
    fn test_run_segments_overlays_and_classifies() {
        let text = "\
1. Che cosa blocca la penicillina?
A) Un beta-lattamico
B) Un macrolide
Risposta A
2. Domanda senza risposta nota?
A) Uno
B) Due
";
        let key: CorrectAnswerMap = [(2, 'B')].into_iter().collect();
        let outcome = flow("generic").run(ctx(), text, Some(&key));

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].correct_answer, Some('A'));
        assert_eq!(outcome.records[0].category, "MICROBIOLOGIA");
        assert_eq!(outcome.records[1].correct_answer, Some('B'));
        assert_eq!(outcome.overlay_stats.from_key, 1);
        assert_eq!(outcome.overlay_stats.from_marker, 1);
        assert_eq!(outcome.needs_verification(), 0);
        assert!(outcome
            .records
            .iter()
            .all(|r| r.provenance.source_file == "prova.pdf"));
    }

    #[test]
    fn test_verbose_run_matches_quiet_run() {
        let text = "1. Che cosa blocca la penicillina?\nA) Un beta-lattamico\nB) Un macrolide\n";
        let quiet = flow("generic").run(ctx(), text, None);
        let verbose = flow("generic").verbose(true).run(ctx(), text, None);
        assert_eq!(quiet.records, verbose.records);
    }

    #[test]
    fn test_unresolved_counted() {
        let text = "1. Domanda?\nA) Uno\nB) Due\n";
        let outcome = flow("generic").run(ctx(), text, None);
        assert_eq!(outcome.needs_verification(), 1);
        assert_eq!(outcome.overlay_stats.unresolved, 1);
    }
}
