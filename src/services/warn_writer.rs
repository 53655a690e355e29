//! 警告写入服务 - 业务能力层
//!
//! 只负责"写人工核对清单"能力，不关心流程

use crate::models::question::QuestionRecord;
use crate::utils::logging::truncate_text;
use anyhow::{Context, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// 警告写入服务
///
/// 职责：
/// - 将缺少正确答案的题目追加到 warn.txt
/// - 每道题一行，写明来源和题号
pub struct WarnWriter {
    warn_file_path: String,
}

impl WarnWriter {
    /// 创建新的警告写入服务
    pub fn new() -> Self {
        Self {
            warn_file_path: "warn.txt".to_string(),
        }
    }

    /// 使用自定义文件路径创建
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            warn_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.warn_file_path
    }

    /// 清空文件，每次运行开始时调用
    pub async fn reset(&self) -> Result<()> {
        tokio::fs::write(&self.warn_file_path, b"")
            .await
            .with_context(|| format!("无法清空警告文件: {}", self.warn_file_path))
    }

    /// 写入单条警告
    pub async fn write(&self, source: &str, record: &QuestionRecord) -> Result<()> {
        self.write_all(source, std::slice::from_ref(record)).await?;
        Ok(())
    }

    /// 追加一个来源中所有需要人工核对的题目，返回写入条数
    pub async fn write_all(&self, source: &str, records: &[QuestionRecord]) -> Result<usize> {
        let lines: String = records
            .iter()
            .filter(|r| !r.has_resolved_answer())
            .map(|r| {
                format!(
                    "来源 {} | 题目 {} | 题干: {}\n",
                    source,
                    r.id,
                    truncate_text(&r.question, 120)
                )
            })
            .collect();
        if lines.is_empty() {
            return Ok(0);
        }
        let count = lines.lines().count();
        debug!("写入警告: 来源 {} | {} 条", source, count);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.warn_file_path)
            .await
            .with_context(|| format!("无法打开警告文件: {}", self.warn_file_path))?;
        file.write_all(lines.as_bytes()).await?;
        file.flush().await?;

        Ok(count)
    }
}

impl Default for WarnWriter {
    fn default() -> Self {
        Self::new()
    }
}
