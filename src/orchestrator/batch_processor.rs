//! 批量来源处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责多个来源的并发处理和结果汇总。
//!
//! ## 核心功能
//!
//! 1. **加载配置**：来源清单、方言文件、分类表
//! 2. **并发控制**：使用 Semaphore 限制同时处理的来源数量
//! 3. **按序汇总**：结果按清单顺序收集，输出与并发度无关
//! 4. **去重合并**：按优先级合并为一个题库
//! 5. **写出结果**：每个来源的输出文件、合并题库、比较报告、人工核对清单
//! 6. **全局统计**

use crate::config::Config;
use crate::error::ConfigError;
use crate::models::bank::{BankArtifact, ClassifiedSource, SourceStats};
use crate::models::dialect::DialectRegistry;
use crate::models::loaders::{
    load_answer_key, load_artifact, load_dialect_file, load_manifest, load_source_text,
    load_taxonomy, write_json,
};
use crate::models::manifest::{SourceEntry, SourceManifest};
use crate::orchestrator::bank_assembler::BankAssembler;
use crate::services::{Deduplicator, SubjectClassifier, WarnWriter};
use crate::utils::logging;
use crate::workflow::{SourceCtx, SourceFlow, SourceOutcome};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 合并题库文件名
pub const MERGED_OUTPUT: &str = "merged-quiz-data.json";

/// 应用主结构
pub struct App {
    config: Config,
}

/// 单个来源的处理结果
enum SourceResult {
    /// 从文本解析得到
    Parsed(SourceOutcome),
    /// 从已有输出文件读入
    Loaded { name: String, artifact: BankArtifact },
    /// 输入不可用，按 0 条记录上报
    Unavailable { name: String },
}

/// 一次运行的汇总
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// 成功读取的来源数
    pub sources: usize,
    /// 无法读取的来源
    pub failed: Vec<String>,
    /// 去重后的题目数
    pub survivors: usize,
    /// 被吸收的重复题目数
    pub absorbed: usize,
    /// 需要人工核对答案的题目数
    pub needs_verification: usize,
    /// 写出的文件
    pub written: Vec<PathBuf>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config.sources_manifest, config.max_concurrent_sources);
        Ok(Self { config })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let manifest = load_manifest(Path::new(&self.config.sources_manifest)).await?;
        let registry = self.load_dialects(&manifest).await?;

        let taxonomy = load_taxonomy(self.config.taxonomy_file.as_deref().map(Path::new)).await?;
        let subjects = Arc::new(SubjectClassifier::new(taxonomy));

        logging::log_sources_loaded(manifest.sources.len(), registry.len());

        let warn_writer = WarnWriter::with_path(&self.config.warn_file);
        warn_writer.reset().await?;
        info!("📝 人工核对清单: {}", warn_writer.path());

        let results = self
            .process_all_sources(&manifest, &registry, subjects)
            .await?;

        let mut summary = RunSummary::default();
        let mut classified = Vec::new();
        let assembler = BankAssembler::new();
        let output_dir = PathBuf::from(&self.config.output_dir);

        for (entry, result) in manifest.sources.iter().zip(results) {
            match result {
                SourceResult::Parsed(outcome) => {
                    let path = output_dir.join(entry.output_name());
                    write_json(&path, &assembler.source_artifact(&outcome)).await?;
                    info!("{} 💾 已写入 {}", outcome.ctx, path.display());
                    summary.written.push(path);

                    warn_writer
                        .write_all(&outcome.ctx.name, &outcome.records)
                        .await?;
                    summary.sources += 1;
                    classified.push(ClassifiedSource::new(outcome.ctx.name, outcome.records));
                }
                SourceResult::Loaded { name, artifact } => {
                    info!("[{}] 已读入 {} 道已分类题目", name, artifact.quizzes.len());
                    summary.sources += 1;
                    classified.push(ClassifiedSource::new(name, artifact.quizzes));
                }
                SourceResult::Unavailable { name } => {
                    summary.failed.push(name);
                }
            }
        }

        if classified.is_empty() {
            anyhow::bail!("没有可用的来源: 清单中的 {} 个来源都无法读取", manifest.sources.len());
        }

        // ========== 去重合并 ==========
        let mut bank = Deduplicator::new(manifest.priority_order()).merge(&classified);
        // 无法读取的来源按 0 条记录出现在合并统计里
        for name in &summary.failed {
            bank.push_stats(SourceStats {
                source: name.clone(),
                ..Default::default()
            });
        }
        let merged = assembler.merged_artifact(&bank);
        let merged_path = output_dir.join(MERGED_OUTPUT);
        write_json(&merged_path, &merged).await?;
        info!("💾 合并题库已写入 {}", merged_path.display());
        summary.written.push(merged_path);

        summary.survivors = bank.len();
        summary.absorbed = bank.total_absorbed();
        summary.needs_verification = merged.metadata.needs_verification;

        // ========== 比较报告 ==========
        if let Some(name) = &self.config.compare_source {
            if let Some(path) = self.write_comparison(name, &classified, &output_dir).await? {
                summary.written.push(path);
            }
        }

        logging::print_final_stats(
            summary.sources,
            summary.failed.len(),
            summary.survivors,
            summary.absorbed,
            summary.needs_verification,
            &self.config.output_log_file,
        );

        Ok(summary)
    }

    /// 内置方言 + 清单中的方言文件；检查每个文本来源的方言都存在
    async fn load_dialects(&self, manifest: &SourceManifest) -> Result<DialectRegistry> {
        let mut registry = DialectRegistry::with_builtins()?;
        if let Some(file) = &manifest.dialect_file {
            load_dialect_file(&mut registry, &manifest.resolve(file)).await?;
        }

        for source in manifest.sources.iter().filter(|s| s.text.is_some()) {
            if !registry.contains(&source.dialect) {
                return Err(ConfigError::UnknownDialect {
                    source_name: source.name.clone(),
                    dialect: source.dialect.clone(),
                }
                .into());
            }
        }
        Ok(registry)
    }

    /// 并发处理所有来源，结果按清单顺序返回
    async fn process_all_sources(
        &self,
        manifest: &SourceManifest,
        registry: &DialectRegistry,
        subjects: Arc<SubjectClassifier>,
    ) -> Result<Vec<SourceResult>> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_sources.max(1)));
        let mut handles = Vec::new();

        for (idx, entry) in manifest.sources.iter().enumerate() {
            let source_index = idx + 1;
            let ctx = SourceCtx::new(
                entry.name.clone(),
                source_index,
                entry.source_file(),
                entry.dialect.clone(),
            );

            // 方言规则在派发前编译，配置错误直接失败
            let flow = match registry.get(&entry.dialect) {
                Some(dialect) if entry.text.is_some() => Some(
                    SourceFlow::new(dialect, subjects.clone())
                        .with_context(|| format!("{} 方言规则无法编译", ctx))?
                        .verbose(self.config.verbose_logging),
                ),
                _ => None,
            };

            let input = SourceInput::new(manifest, entry);
            let semaphore = semaphore.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await?;
                Ok::<_, anyhow::Error>(process_source(ctx, input, flow).await)
            });
            handles.push((entry.name.clone(), handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        let joined = futures::future::join_all(handles.into_iter().map(|(name, handle)| async move {
            (name, handle.await)
        }))
        .await;

        for (name, joined) in joined {
            match joined {
                Ok(Ok(result)) => results.push(result),
                Ok(Err(e)) => {
                    error!("[{}] ❌ 处理过程中发生错误: {}", name, e);
                    results.push(SourceResult::Unavailable { name });
                }
                Err(e) => {
                    error!("[{}] 任务执行失败: {}", name, e);
                    results.push(SourceResult::Unavailable { name });
                }
            }
        }

        Ok(results)
    }

    async fn write_comparison(
        &self,
        name: &str,
        classified: &[ClassifiedSource],
        output_dir: &Path,
    ) -> Result<Option<PathBuf>> {
        let Some(candidate) = classified.iter().find(|s| s.name == name) else {
            warn!("⚠️ 比较来源 {} 不存在或无法读取，跳过比较报告", name);
            return Ok(None);
        };
        let existing: Vec<ClassifiedSource> = classified
            .iter()
            .filter(|s| s.name != name)
            .cloned()
            .collect();

        let report = Deduplicator::compare(&existing, candidate);
        info!(
            "[{}] 比较: 重复 {}，独有 {}",
            name,
            report.duplicates.len(),
            report.unique.len()
        );

        let path = output_dir.join(format!("comparison-{}-report.json", name));
        write_json(&path, &report).await?;
        Ok(Some(path))
    }
}

/// 一个来源的输入路径（已按清单目录解析）
struct SourceInput {
    text: Option<PathBuf>,
    artifact: Option<PathBuf>,
    answer_key: Option<PathBuf>,
}

impl SourceInput {
    fn new(manifest: &SourceManifest, entry: &SourceEntry) -> Self {
        Self {
            text: entry.text.as_deref().map(|p| manifest.resolve(p)),
            artifact: entry.artifact.as_deref().map(|p| manifest.resolve(p)),
            answer_key: entry.answer_key.as_deref().map(|p| manifest.resolve(p)),
        }
    }
}

/// 处理单个来源
async fn process_source(ctx: SourceCtx, input: SourceInput, flow: Option<SourceFlow>) -> SourceResult {
    info!("{} 开始处理", ctx);

    if let Some(path) = &input.artifact {
        return match load_artifact(path).await {
            Ok(artifact) => SourceResult::Loaded {
                name: ctx.name,
                artifact,
            },
            Err(e) => {
                warn!("{} ⚠️ {:#}", ctx, e);
                SourceResult::Unavailable { name: ctx.name }
            }
        };
    }

    let (Some(path), Some(flow)) = (&input.text, flow) else {
        return SourceResult::Unavailable { name: ctx.name };
    };

    let Some(text) = load_source_text(path).await else {
        warn!("{} ⚠️ 来源不可用，题目总数: 0", ctx);
        return SourceResult::Unavailable { name: ctx.name };
    };

    let answer_key = match &input.answer_key {
        Some(path) => load_answer_key(path).await,
        None => None,
    };

    let outcome = flow.run(ctx, &text, answer_key.as_ref());
    info!(
        "{} ✅ 处理完成: {} 道题目，{} 道待核对",
        outcome.ctx,
        outcome.records.len(),
        outcome.needs_verification()
    );
    SourceResult::Parsed(outcome)
}
