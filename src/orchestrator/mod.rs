//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责后台执行和进度上报，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `worker` - 后台工作线程
//! - 持有唯一的工作线程和它的 tokio 运行时
//! - 接收界面线程的提交 / 取消请求
//! - 拒绝在忙碌时提交新任务
//!
//! ### `batch_processor` - 批处理器
//! - 逐行校验并执行任务
//! - 在两行之间检查取消标志
//! - 发布快照和最终统计
//!
//! ### `events` - 进度 / 错误事件通道
//! - 工作线程发送，界面线程自行取出
//!
//! ## 层次关系
//!
//! ```text
//! worker (界面线程 ↔ 工作线程)
//!     ↓
//! batch_processor (处理 Vec<JobDraft>)
//!     ↓
//! workflow::JobFlow (处理单个任务)
//!     ↓
//! services (能力层：浏览器 / 下载监控 / 标签)
//!     ↓
//! infrastructure (基础设施：PageDriver / 完成信号)
//! ```

pub mod batch_processor;
pub mod events;
pub mod worker;

// 重新导出主要类型
pub use batch_processor::{BatchProcessor, CancelFlag};
pub use events::{progress_channel, ChannelProgressSink, EventReceiver, NullSink, ProgressEvent, ProgressSink};
pub use worker::Orchestrator;
