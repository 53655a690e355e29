/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 来源清单（TOML）路径
    pub sources_manifest: String,
    /// 输出目录
    pub output_dir: String,
    /// 外部分类表路径，为空时使用内置分类表
    pub taxonomy_file: Option<String>,
    /// 同时处理的来源数量
    pub max_concurrent_sources: usize,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 人工核对清单
    pub warn_file: String,
    /// 需要与其他来源比较的来源名称
    pub compare_source: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources_manifest: "sources.toml".to_string(),
            output_dir: "output".to_string(),
            taxonomy_file: None,
            max_concurrent_sources: 4,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            warn_file: "warn.txt".to_string(),
            compare_source: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            sources_manifest: std::env::var("SOURCES_MANIFEST").unwrap_or(default.sources_manifest),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            taxonomy_file: std::env::var("TAXONOMY_FILE").ok().filter(|v| !v.is_empty()).or(default.taxonomy_file),
            max_concurrent_sources: std::env::var("MAX_CONCURRENT_SOURCES").ok().and_then(|v| v.parse().ok()).filter(|&n: &usize| n > 0).unwrap_or(default.max_concurrent_sources),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            warn_file: std::env::var("WARN_FILE").unwrap_or(default.warn_file),
            compare_source: std::env::var("COMPARE_SOURCE").ok().filter(|v| !v.is_empty()).or(default.compare_source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.sources_manifest, "sources.toml");
        assert_eq!(config.max_concurrent_sources, 4);
        assert!(config.taxonomy_file.is_none());
        assert!(!config.verbose_logging);
    }
}
