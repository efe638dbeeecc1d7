//! # YT MP3 Downloader
//!
//! 把视频链接通过转换网站下载为 MP3，并写入艺术家 / 标题 / 专辑 / 音轨号
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `PageDriver` - 唯一的 page owner，提供 eval() / 点击 / 输入能力
//! - `CompletionSignal` - 下载监控与流程之间的一次性完成信号
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文件
//! - `PollingWatcher` - 发现并确认下载完成的文件
//! - `Id3Tagger` - 备份 / 写入 / 恢复 ID3 标签
//! - `browser::ChromeConverter` - 操作转换网站
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个任务"的完整处理流程
//! - `JobCtx` - 上下文封装（序号 + 表格行号）
//! - `JobFlow` - 流程编排（浏览器 → 检测 → 释放 → 标签）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/worker` - 后台工作线程，忙碌保护与取消
//! - `orchestrator/batch_processor` - 批处理，逐行执行并发布快照
//! - `orchestrator/events` - 进度 / 错误事件通道
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::ChromeConverter;
pub use config::{Config, FlowSettings};
pub use error::{AppError, AppResult, FailureKind};
pub use infrastructure::{completion_signal, CompletionSignal, PageDriver, SignalOutcome};
pub use models::{BatchSnapshot, BatchStatus, BatchSummary, JobDescriptor, JobDraft, RunResult, TagFields};
pub use orchestrator::{BatchProcessor, CancelFlag, Orchestrator, ProgressEvent, ProgressSink};
pub use services::{Id3Tagger, PollingWatcher};
pub use workflow::{JobCtx, JobFlow};
