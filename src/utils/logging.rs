/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 初始化日志系统
///
/// 控制台按 `RUST_LOG` 过滤（默认 info，详细模式 debug）；
/// 给出 `log_file` 时同时追加写入该文件（不带颜色）。
/// 重复初始化（如测试中）直接忽略。
pub fn init(verbose: bool, log_file: Option<&str>) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("无法打开日志文件: {}", path))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false)
                    .with_filter(EnvFilter::new(default_level)),
            )
        }
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n题库导入日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)
        .with_context(|| format!("无法写入日志文件: {}", log_file_path))?;
    Ok(())
}

/// 记录程序启动信息
///
/// # 参数
/// - `manifest`: 来源清单路径
/// - `max_concurrent`: 最大并发数
pub fn log_startup(manifest: &str, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多来源题库导入模式");
    info!("📄 来源清单: {}", manifest);
    info!("📊 最大并发数: {}", max_concurrent);
    info!("{}", "=".repeat(60));
}

/// 记录来源加载信息
pub fn log_sources_loaded(total: usize, dialects: usize) {
    info!("✓ 清单中共有 {} 个来源", total);
    info!("📋 可用方言 {} 种\n", dialects);
}

/// 打印最终统计信息
///
/// # 参数
/// - `sources`: 成功处理的来源数
/// - `failed`: 无法读取的来源数
/// - `survivors`: 去重后保留的题目数
/// - `absorbed`: 被吸收的重复题目数
/// - `needs_verification`: 需要人工核对答案的题目数
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(
    sources: usize,
    failed: usize,
    survivors: usize,
    absorbed: usize,
    needs_verification: usize,
    log_file_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 处理来源: {}/{}", sources, sources + failed);
    info!("📚 题库题目: {}", survivors);
    info!("🔁 重复题目: {}", absorbed);
    info!("⚠️ 待核对答案: {}", needs_verification);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("àèìòùx", 5), "àèìòù...");
    }

    #[test]
    fn test_init_log_file_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.txt");
        init_log_file(&path.to_string_lossy()).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("题库导入日志"));
    }
}
