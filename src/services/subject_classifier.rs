//! 学科分类服务 - 业务能力层
//!
//! 按关键词出现次数给题目打分，得出类别和子类别。纯函数，不持有可变状态。

use crate::models::bank::CategoryCount;
use crate::models::question::QuestionRecord;
use crate::models::taxonomy::{SubcategoryFallback, Taxonomy};

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    pub subcategory: Option<String>,
    pub score: usize,
}

/// 不区分大小写、不重叠的字面出现次数（`haystack` 与 `keyword` 均已小写）
fn occurrences(haystack: &str, keyword: &str) -> usize {
    if keyword.is_empty() {
        return 0;
    }
    haystack.matches(keyword).count()
}

fn score(haystack: &str, keywords: &[String]) -> usize {
    keywords.iter().map(|k| occurrences(haystack, k)).sum()
}

/// 严格最高分胜出，平分取先出现者
fn best<'a, I>(candidates: I) -> Option<(&'a str, usize)>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut best: Option<(&'a str, usize)> = None;
    for (name, s) in candidates {
        match best {
            Some((_, top)) if s <= top => {}
            _ => best = Some((name, s)),
        }
    }
    best
}

/// 学科分类器
#[derive(Debug, Clone)]
pub struct SubjectClassifier {
    taxonomy: Taxonomy,
}

impl SubjectClassifier {
    pub fn new(taxonomy: Taxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// 对题干和选项文本分类
    pub fn classify(&self, question: &str, answers_text: &str) -> Classification {
        let haystack = format!("{} {}", question, answers_text).to_lowercase();

        let scored = self
            .taxonomy
            .categories
            .iter()
            .map(|c| (c.name.as_str(), score(&haystack, &c.keywords)));
        let top = best(scored).filter(|(_, s)| *s >= self.taxonomy.min_score);

        let Some((category_name, category_score)) = top else {
            return Classification {
                category: self.taxonomy.fallback_category.clone(),
                subcategory: None,
                score: 0,
            };
        };

        let subcategory = self.taxonomy.category(category_name).and_then(|category| {
            let sub_scored = category
                .subcategories
                .iter()
                .map(|s| (s.name.as_str(), score(&haystack, &s.keywords)));
            match best(sub_scored) {
                Some((name, s)) if s >= self.taxonomy.min_score => Some(name.to_string()),
                _ => match self.taxonomy.subcategory_fallback {
                    SubcategoryFallback::FirstDeclared => {
                        category.subcategories.first().map(|s| s.name.clone())
                    }
                    SubcategoryFallback::Uncategorized => {
                        Some(Taxonomy::uncategorized_name(&category.name))
                    }
                },
            }
        });

        Classification {
            category: category_name.to_string(),
            subcategory,
            score: category_score,
        }
    }

    /// 分类并写回记录
    pub fn classify_record(&self, record: &mut QuestionRecord) -> Classification {
        let result = self.classify(&record.question, &record.answers_text());
        record.category = result.category.clone();
        record.subcategory = result.subcategory.clone();
        result
    }

    /// 各类别得分（详细日志用）
    pub fn scores(&self, question: &str, answers_text: &str) -> Vec<(String, usize)> {
        let haystack = format!("{} {}", question, answers_text).to_lowercase();
        self.taxonomy
            .categories
            .iter()
            .map(|c| (c.name.clone(), score(&haystack, &c.keywords)))
            .collect()
    }
}

/// 按类别计数，数量降序（相同数量保持首次出现顺序）
pub fn category_distribution(records: &[QuestionRecord]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|c| c.category == record.category) {
            Some(entry) => entry.count += 1,
            None => counts.push(CategoryCount {
                category: record.category.clone(),
                count: 1,
            }),
        }
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{AnswerOption, Provenance};

    fn builtin() -> SubjectClassifier {
        SubjectClassifier::new(Taxonomy::builtin().unwrap())
    }

    fn small(fallback: &str) -> SubjectClassifier {
        let taxonomy = Taxonomy::from_toml_str(&format!(
            r#"
subcategory_fallback = "{}"

[[categories]]
name = "UNO"
keywords = ["alfa", "beta"]

[[categories.subcategories]]
name = "UNO_PRIMA"
keywords = ["gamma"]

[[categories.subcategories]]
name = "UNO_SECONDA"
keywords = ["delta"]

[[categories]]
name = "DUE"
keywords = ["beta", "zeta"]
"#,
            fallback
        ))
        .unwrap();
        SubjectClassifier::new(taxonomy)
    }

    #[test]
    fn test_single_keyword_category() {
        let c = builtin();
        let result = c.classify("la penicillina, la penicillina e ancora la penicillina", "");
        assert_eq!(result.category, "MICROBIOLOGIA");
        assert_eq!(result.score, 3);
    }

    #[test]
    fn test_no_keyword_falls_back() {
        let c = builtin();
        let result = c.classify("Qwerty?", "Uno Due");
        assert_eq!(result.category, "ALTRO");
        assert_eq!(result.subcategory, None);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_tie_goes_to_first_declared() {
        let c = small("first_declared");
        let result = c.classify("beta", "");
        assert_eq!(result.category, "UNO");

        let scores = c.scores("beta", "");
        assert_eq!(
            scores,
            vec![("UNO".to_string(), 1), ("DUE".to_string(), 1)]
        );
    }

    #[test]
    fn test_case_insensitive_counting() {
        let c = small("first_declared");
        let result = c.classify("ZETA Zeta zeta", "ALFA");
        assert_eq!(result.category, "DUE");
        assert_eq!(result.score, 3);
    }

    #[test]
    fn test_subcategory_scoring_and_fallback() {
        let c = small("first_declared");
        assert_eq!(
            c.classify("alfa delta", "").subcategory.as_deref(),
            Some("UNO_SECONDA")
        );
        assert_eq!(
            c.classify("alfa", "").subcategory.as_deref(),
            Some("UNO_PRIMA")
        );

        let explicit = small("uncategorized");
        assert_eq!(
            explicit.classify("alfa", "").subcategory.as_deref(),
            Some("UNO_NON_CLASSIFICATA")
        );

        // 没有子类别的类别
        assert_eq!(c.classify("zeta", "").subcategory, None);
    }

    #[test]
    fn test_deterministic() {
        let c = builtin();
        let q = "Quale antibiotico beta-lattamico è attivo contro i batteri gram-negativi?";
        let a = "Amoxicillina Ceftriaxone Vancomicina";
        assert_eq!(c.classify(q, a), c.classify(q, a));
    }

    #[test]
    fn test_distribution_sorted_by_count() {
        let record = |category: &str| QuestionRecord {
            id: 1,
            question: "q".to_string(),
            category: category.to_string(),
            subcategory: None,
            answers: vec![AnswerOption {
                letter: 'A',
                text: "a".to_string(),
            }],
            correct_answer: None,
            provenance: Provenance::default(),
        };
        let records = vec![record("ALTRO"), record("FARMACOLOGIA"), record("FARMACOLOGIA"), record("LEGISLAZIONE")];
        let dist = category_distribution(&records);
        assert_eq!(dist[0].category, "FARMACOLOGIA");
        assert_eq!(dist[0].count, 2);
        assert_eq!(dist[1].category, "ALTRO");
        assert_eq!(dist[2].category, "LEGISLAZIONE");
    }
}
