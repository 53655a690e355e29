//! # Quiz Bank Ingest
//!
//! 把多种格式的考试题文本导出（PDF 文本、OCR 结果）整理成统一的题库，
//! 并跨来源去重。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 题目记录、行分类结果、方言规则表、分类表、来源清单
//! - `models/loaders` - 唯一做文件读写的地方（tokio::fs）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，同步、无 IO
//! - `LineClassifier` - 按方言规则给每行定类型
//! - `Segmenter` - 把行组装成题目
//! - `answer_key` - 外部答案表覆盖
//! - `SubjectClassifier` - 关键词打分分类
//! - `Deduplicator` - 指纹去重与比较
//! - `WarnWriter` - 写人工核对清单
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个来源"的完整处理流程
//! - `SourceCtx` - 上下文封装（来源名称 + 序号 + 方言）
//! - `SourceFlow` - 流程编排（行分类 → 分段 → 答案表 → 分类）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 多来源并发处理、去重合并、写出
//! - `orchestrator/bank_assembler` - 输出文件组装
//!
//! ## 模块结构

pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::question::QuestionRecord;
pub use models::{Dialect, SourceManifest};
pub use orchestrator::{App, BankAssembler, RunSummary};
pub use workflow::{SourceCtx, SourceFlow, SourceOutcome};
