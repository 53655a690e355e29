//! 来源清单
//!
//! ```toml
//! priority = ["modello5", "unisa"]
//! dialect_file = "dialects.toml"
//!
//! [[sources]]
//! name = "modello5"
//! text = "modello5.txt"
//! dialect = "modello5"
//! source_file = "Modello5.pdf"
//! answer_key = "modello5-answers.json"
//! ```
//!
//! 相对路径相对于清单所在目录解析。

use crate::error::{AppResult, ConfigError};
use crate::models::dialect::DEFAULT_DIALECT;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

/// 清单中的单个来源
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    /// 文本导出文件
    #[serde(default)]
    pub text: Option<String>,
    /// 已分类好的输出文件（跳过解析，直接参与去重）
    #[serde(default)]
    pub artifact: Option<String>,
    #[serde(default = "default_dialect")]
    pub dialect: String,
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub answer_key: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
}

impl SourceEntry {
    /// 写入记录 provenance 的原始文件名，默认为来源名称
    pub fn source_file(&self) -> String {
        self.source_file.clone().unwrap_or_else(|| self.name.clone())
    }

    /// 输出文件名
    pub fn output_name(&self) -> String {
        self.output
            .clone()
            .unwrap_or_else(|| format!("{}-quiz-data.json", self.name))
    }
}

/// 来源清单
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceManifest {
    #[serde(default)]
    pub priority: Vec<String>,
    #[serde(default)]
    pub dialect_file: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    /// 清单所在目录
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl SourceManifest {
    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> AppResult<Self> {
        let mut manifest: SourceManifest = toml::from_str(content)?;
        manifest.base_dir = base_dir.into();
        Ok(manifest)
    }

    /// 相对路径按清单目录解析
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// 去重优先级：显式 priority 在前，其余来源按声明顺序追加
    pub fn priority_order(&self) -> Vec<String> {
        let mut order: Vec<String> = self.priority.clone();
        for source in &self.sources {
            if !order.contains(&source.name) {
                order.push(source.name.clone());
            }
        }
        order
    }

    pub fn source(&self, name: &str) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// 结构校验（方言是否存在由调用方对照注册表检查）
    pub fn validate(&self, path: &str) -> AppResult<()> {
        if self.sources.is_empty() {
            return Err(ConfigError::EmptyManifest {
                path: path.to_string(),
            }
            .into());
        }
        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(ConfigError::DuplicateSource {
                    name: source.name.clone(),
                }
                .into());
            }
            if source.text.is_some() == source.artifact.is_some() {
                return Err(ConfigError::AmbiguousInput {
                    source_name: source.name.clone(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    const MANIFEST: &str = r#"
priority = ["modello5"]

[[sources]]
name = "unisa"
text = "unisa.txt"
dialect = "unisa"

[[sources]]
name = "modello5"
text = "/data/modello5.txt"
dialect = "modello5"
source_file = "Modello5.pdf"
answer_key = "modello5-answers.json"
output = "m5.json"

[[sources]]
name = "vecchio"
artifact = "vecchio-quiz-data.json"
"#;

    #[test]
    fn test_parse_and_defaults() {
        let manifest = SourceManifest::from_toml_str(MANIFEST, "/banca").unwrap();
        manifest.validate("sources.toml").unwrap();

        let unisa = manifest.source("unisa").unwrap();
        assert_eq!(unisa.source_file(), "unisa");
        assert_eq!(unisa.output_name(), "unisa-quiz-data.json");

        let vecchio = manifest.source("vecchio").unwrap();
        assert_eq!(vecchio.dialect, "generic");

        let m5 = manifest.source("modello5").unwrap();
        assert_eq!(m5.source_file(), "Modello5.pdf");
        assert_eq!(m5.output_name(), "m5.json");
    }

    #[test]
    fn test_resolve_relative_paths() {
        let manifest = SourceManifest::from_toml_str(MANIFEST, "/banca").unwrap();
        assert_eq!(manifest.resolve("unisa.txt"), PathBuf::from("/banca/unisa.txt"));
        assert_eq!(
            manifest.resolve("/data/modello5.txt"),
            PathBuf::from("/data/modello5.txt")
        );
    }

    #[test]
    fn test_priority_order_appends_unlisted() {
        let manifest = SourceManifest::from_toml_str(MANIFEST, "/banca").unwrap();
        assert_eq!(
            manifest.priority_order(),
            vec!["modello5", "unisa", "vecchio"]
        );
    }

    #[test]
    fn test_validation_errors() {
        let empty = SourceManifest::from_toml_str("", ".").unwrap();
        assert!(matches!(
            empty.validate("x.toml").unwrap_err(),
            AppError::Config(ConfigError::EmptyManifest { .. })
        ));

        let dup = SourceManifest::from_toml_str(
            "[[sources]]\nname = \"a\"\ntext = \"a.txt\"\n[[sources]]\nname = \"a\"\ntext = \"b.txt\"\n",
            ".",
        )
        .unwrap();
        assert!(matches!(
            dup.validate("x.toml").unwrap_err(),
            AppError::Config(ConfigError::DuplicateSource { .. })
        ));

        let neither = SourceManifest::from_toml_str("[[sources]]\nname = \"a\"\n", ".").unwrap();
        assert!(matches!(
            neither.validate("x.toml").unwrap_err(),
            AppError::Config(ConfigError::AmbiguousInput { .. })
        ));
    }
}
