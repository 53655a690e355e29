//! 来源处理上下文
//!
//! 封装"我正在处理第几个来源、用哪种方言"这一信息

use std::fmt::Display;

/// 来源处理上下文
#[derive(Debug, Clone)]
pub struct SourceCtx {
    /// 来源名称（清单中的 name）
    pub name: String,

    /// 来源在清单中的序号（从1开始，仅用于日志显示）
    pub source_index: usize,

    /// 写入记录 provenance 的原始文件名
    pub source_file: String,

    /// 方言名称
    pub dialect: String,
}

impl SourceCtx {
    pub fn new(name: String, source_index: usize, source_file: String, dialect: String) -> Self {
        Self {
            name,
            source_index,
            source_file,
            dialect,
        }
    }
}

impl Display for SourceCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[来源 #{} {} 方言 {}]",
            self.source_index, self.name, self.dialect
        )
    }
}
