//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责多来源的调度、汇总和写出，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量来源处理器
//! - 管理应用生命周期（初始化、运行）
//! - 读取来源清单、方言文件、分类表
//! - 控制并发数量（Semaphore）
//! - 去重合并、写出文件、输出全局统计
//!
//! ### `bank_assembler` - 题库组装器
//! - 生成 `{ metadata, quizzes }` 输出文件
//! - 通用方言文本导出
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<SourceEntry>)
//!     ↓
//! workflow::SourceFlow (处理单个来源)
//!     ↓
//! services (能力层：行分类 / 分段 / 答案表 / 学科分类 / 去重)
//!     ↓
//! models (数据结构、方言规则、分类表)
//! ```

pub mod bank_assembler;
pub mod batch_processor;

pub use bank_assembler::BankAssembler;
pub use batch_processor::{App, RunSummary};
