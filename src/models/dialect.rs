//! 来源方言（Dialect）
//!
//! 每种导出格式用一张声明式的行形状规则表描述，行分类器只认规则表，不认格式名。
//! 内置方言以 TOML 形式嵌入二进制，通过 `phf` 静态表按名称查找；
//! 清单中的 `dialect_file` 可以覆盖或追加方言。

use crate::error::{AppError, AppResult, DialectError};
use crate::models::line::TokenKind;
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 内置方言表：名称 -> TOML 源文本
static BUILTIN_DIALECTS: phf::Map<&'static str, &'static str> = phf_map! {
    "generic" => include_str!("dialects/generic.toml"),
    "unisa" => include_str!("dialects/unisa.toml"),
    "modello2" => include_str!("dialects/modello2.toml"),
    "modello3" => include_str!("dialects/modello3.toml"),
    "modello4" => include_str!("dialects/modello4.toml"),
    "modello5" => include_str!("dialects/modello5.toml"),
    "modello6" => include_str!("dialects/modello6.toml"),
    "modello7" => include_str!("dialects/modello7.toml"),
};

/// 默认方言名称
pub const DEFAULT_DIALECT: &str = "generic";

fn default_id_seed() -> u32 {
    1
}

fn default_min_continuation_len() -> usize {
    1
}

/// 单条行规则
///
/// `pattern` 中可使用的命名捕获组：
/// - `num`：题号
/// - `major` / `minor`：两段式题号（`3.12)`），合成为 `major * 100 + minor`
/// - `text`：正文
/// - `letter`：选项字母
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRule {
    pub pattern: String,
    /// 否决模式：整行匹配该模式时本规则不生效
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<String>,
    /// 整行最少字符数
    #[serde(default)]
    pub min_len: usize,
    /// 上一行属于这些类型时本规则不生效
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_after: Vec<TokenKind>,
}

/// OCR 误识别字符到选项字母的映射（如 "4" 实为 "A"）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrAlias {
    pub glyph: String,
    pub letter: char,
}

/// 一种来源格式的完整规则表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 没有显式题号时的起始编号
    #[serde(default = "default_id_seed")]
    pub id_seed: u32,
    /// 识别 ☐ / ✓ / ☑ 勾选框选项
    #[serde(default)]
    pub checkboxes: bool,
    /// 单独一行的 A-E 视为选项字母，正文在下一行
    #[serde(default)]
    pub bare_letter_options: bool,
    /// 选项没有字母：题干结束后，每个续行是一个新选项
    #[serde(default)]
    pub implicit_options: bool,
    /// 题干结束标志（仅在 implicit_options 下使用）；为空时题干只占一行
    #[serde(default)]
    pub question_terminators: Vec<String>,
    /// 续行最少字符数，更短的行视为噪声
    #[serde(default = "default_min_continuation_len")]
    pub min_continuation_len: usize,
    /// 在切行阶段直接丢弃的行
    #[serde(default)]
    pub skip: Vec<String>,
    #[serde(default)]
    pub question_start: Vec<LineRule>,
    #[serde(default)]
    pub answer: Vec<LineRule>,
    #[serde(default)]
    pub ocr_alias: Vec<OcrAlias>,
    #[serde(default)]
    pub correct: Vec<LineRule>,
    /// 不带字母的答案公告，字母在下一行
    #[serde(default)]
    pub announce: Vec<LineRule>,
    #[serde(default)]
    pub separator: Vec<LineRule>,
    #[serde(default)]
    pub page: Vec<LineRule>,
    #[serde(default)]
    pub noise: Vec<LineRule>,
}

impl Dialect {
    /// 从 TOML 文本解析单个方言
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        let dialect: Dialect = toml::from_str(content)?;
        dialect.validate()?;
        Ok(dialect)
    }

    /// 取内置方言
    pub fn builtin(name: &str) -> AppResult<Self> {
        let source = BUILTIN_DIALECTS
            .get(name)
            .ok_or_else(|| DialectError::Unknown {
                name: name.to_string(),
            })?;
        Self::from_toml_str(source)
    }

    /// 所有内置方言名称（按名称排序）
    pub fn builtin_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = BUILTIN_DIALECTS.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("名称为空"));
        }
        if self.id_seed == 0 {
            return Err(self.invalid("id_seed 必须大于 0"));
        }
        if self.question_start.is_empty() {
            return Err(self.invalid("至少需要一条 question_start 规则"));
        }
        for alias in &self.ocr_alias {
            if crate::models::question::normalize_letter(alias.letter).is_none() {
                return Err(self.invalid(format!("OCR 映射字母非法: {}", alias.letter)));
            }
        }
        Ok(())
    }

    fn invalid(&self, message: impl Into<String>) -> AppError {
        AppError::Dialect(DialectError::Invalid {
            dialect: self.name.clone(),
            message: message.into(),
        })
    }
}

/// 外部方言文件：`[[dialects]]` 数组
#[derive(Debug, Deserialize)]
struct DialectFile {
    #[serde(default)]
    dialects: Vec<Dialect>,
}

/// 方言注册表
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    dialects: HashMap<String, Dialect>,
}

impl DialectRegistry {
    /// 创建包含全部内置方言的注册表
    pub fn with_builtins() -> AppResult<Self> {
        let mut registry = Self::default();
        for name in Dialect::builtin_names() {
            registry.insert(Dialect::builtin(name)?);
        }
        Ok(registry)
    }

    /// 加入（或覆盖）一个方言
    pub fn insert(&mut self, dialect: Dialect) {
        self.dialects.insert(dialect.name.clone(), dialect);
    }

    /// 从外部方言文件追加，返回加载的方言数量
    pub fn extend_from_toml_str(&mut self, content: &str) -> AppResult<usize> {
        let file: DialectFile = toml::from_str(content)?;
        let count = file.dialects.len();
        for dialect in file.dialects {
            dialect.validate()?;
            tracing::debug!("加载方言: {}", dialect.name);
            self.insert(dialect);
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&Dialect> {
        self.dialects.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dialects.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.dialects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialects.is_empty()
    }
}
