//! 学科分类表
//!
//! 一份带版本号的 TOML 资源，所有来源共用。内置一份，也可以通过 `TAXONOMY_FILE` 外部加载。

use crate::error::{AppResult, TaxonomyError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const BUILTIN_TAXONOMY: &str = include_str!("taxonomy.toml");

fn default_version() -> u32 {
    1
}

fn default_fallback_category() -> String {
    "ALTRO".to_string()
}

fn default_min_score() -> usize {
    1
}

/// 没有子类别达到阈值时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcategoryFallback {
    /// 取第一个声明的子类别（历史行为）
    #[default]
    FirstDeclared,
    /// 使用显式的 `<类别>_NON_CLASSIFICATA`
    Uncategorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcategoryDef {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryDef>,
}

/// 分类表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_fallback_category")]
    pub fallback_category: String,
    #[serde(default = "default_min_score")]
    pub min_score: usize,
    #[serde(default)]
    pub subcategory_fallback: SubcategoryFallback,
    #[serde(default)]
    pub categories: Vec<CategoryDef>,
}

impl Taxonomy {
    /// 内置分类表
    pub fn builtin() -> AppResult<Self> {
        Self::from_toml_str(BUILTIN_TAXONOMY)
    }

    /// 解析并校验；关键词统一转小写
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let mut taxonomy: Taxonomy = toml::from_str(content)?;
        taxonomy.validate()?;
        taxonomy.normalize();
        Ok(taxonomy)
    }

    pub fn category(&self, name: &str) -> Option<&CategoryDef> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// 子类别兜底名称
    pub fn uncategorized_name(category: &str) -> String {
        format!("{}_NON_CLASSIFICATA", category)
    }

    fn validate(&self) -> Result<(), TaxonomyError> {
        if self.categories.is_empty() {
            return Err(TaxonomyError::Empty);
        }
        let mut seen = HashSet::new();
        for (index, category) in self.categories.iter().enumerate() {
            if category.name.trim().is_empty() {
                return Err(TaxonomyError::EmptyName { index });
            }
            if !seen.insert(category.name.as_str()) {
                return Err(TaxonomyError::DuplicateCategory {
                    name: category.name.clone(),
                });
            }
            let mut sub_seen = HashSet::new();
            for sub in &category.subcategories {
                if sub.name.trim().is_empty() || !sub_seen.insert(sub.name.as_str()) {
                    return Err(TaxonomyError::DuplicateSubcategory {
                        category: category.name.clone(),
                        name: sub.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let lower = |keywords: &mut Vec<String>| {
            keywords.retain(|k| !k.trim().is_empty());
            for k in keywords.iter_mut() {
                *k = k.to_lowercase();
            }
        };
        for category in &mut self.categories {
            lower(&mut category.keywords);
            for sub in &mut category.subcategories {
                lower(&mut sub.keywords);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn test_builtin_taxonomy() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(taxonomy.version, 1);
        assert_eq!(taxonomy.fallback_category, "ALTRO");
        assert_eq!(taxonomy.min_score, 1);
        assert_eq!(taxonomy.subcategory_fallback, SubcategoryFallback::FirstDeclared);
        assert_eq!(taxonomy.categories.len(), 9);
        assert_eq!(taxonomy.categories[0].name, "FARMACOLOGIA");
        assert!(taxonomy
            .categories
            .iter()
            .all(|c| c.subcategories.len() == 4));
    }

    #[test]
    fn test_keywords_are_lowercased() {
        let taxonomy = Taxonomy::from_toml_str(
            r#"
[[categories]]
name = "X"
keywords = ["PH", "  ", "Gram-Positiv"]
"#,
        )
        .unwrap();
        assert_eq!(taxonomy.categories[0].keywords, vec!["ph", "gram-positiv"]);
        assert_eq!(taxonomy.fallback_category, "ALTRO");
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = Taxonomy::from_toml_str(
            r#"
[[categories]]
name = "X"

[[categories]]
name = "X"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AppError::Taxonomy(TaxonomyError::DuplicateCategory { .. })
        ));
    }

    #[test]
    fn test_rejects_empty() {
        let err = Taxonomy::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, AppError::Taxonomy(TaxonomyError::Empty)));
    }
}
