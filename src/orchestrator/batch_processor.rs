//! 批处理器 - 编排层
//!
//! ## 职责
//!
//! 按顺序执行一批任务，每行完成（包括浏览器释放）后才开始下一行。
//!
//! ## 核心功能
//!
//! 1. **逐行校验**：表格中的行可能格式错误，校验失败的行记为跳过，不中断批处理
//! 2. **逐行执行**：委托 `JobFlow` 处理单个任务
//! 3. **协作式取消**：只在两行之间检查取消标志，不会打断正在执行的任务
//! 4. **进度发布**：每行结束后整体替换快照并发送事件
//! 5. **最终统计**：汇总成功 / 失败 / 跳过 / 未执行的数量

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{BatchSnapshot, BatchState, BatchSummary, JobDescriptor, JobDraft, RunResult};
use crate::orchestrator::events::{ProgressEvent, ProgressSink};
use crate::workflow::{JobCtx, JobFlow};

/// 取消标志，界面线程设置，批处理线程在两行之间读取
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// 批处理器
pub struct BatchProcessor {
    flow: Arc<JobFlow>,
    snapshots: watch::Sender<BatchSnapshot>,
}

impl BatchProcessor {
    pub fn new(flow: Arc<JobFlow>) -> Self {
        let (snapshots, _) = watch::channel(BatchSnapshot::default());
        Self { flow, snapshots }
    }

    /// 订阅批处理快照
    pub fn subscribe(&self) -> watch::Receiver<BatchSnapshot> {
        self.snapshots.subscribe()
    }

    /// 执行一个直接提交的任务
    pub async fn run_single(&self, job: &JobDescriptor, sink: &dyn ProgressSink) -> RunResult {
        self.flow.run(job, &JobCtx::single(), sink).await
    }

    /// 执行整批任务
    pub async fn run_batch(
        &self,
        drafts: Vec<JobDraft>,
        cancel: &CancelFlag,
        sink: &dyn ProgressSink,
    ) -> BatchSummary {
        let total = drafts.len();
        let mut state = BatchState::start(total);
        self.snapshots.send_replace(state.snapshot());
        log_batch_start(total);

        for (i, draft) in drafts.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!("⏹️ 批处理已取消，剩余 {} 行未执行", total - i);
                state.cancel();
                break;
            }

            let row = draft.row.unwrap_or(i + 1);
            let ctx = JobCtx::new(i + 1, total, Some(row));

            match draft.validate() {
                Ok(job) => {
                    let result = self.flow.run(&job, &ctx, sink).await;
                    state.record_result(row, &result);
                }
                Err(errors) => {
                    let message = AppError::from(errors).user_message();
                    warn!("{} ⏭️ 跳过: {}", ctx, message);
                    state.record_skipped(row, message);
                }
            }

            let snapshot = state.snapshot();
            self.snapshots.send_replace(snapshot.clone());
            sink.emit(ProgressEvent::BatchProgress {
                index: i + 1,
                total,
                snapshot,
            });
        }

        let summary = state.finish();
        self.snapshots.send_replace(summary.snapshot());
        log_batch_complete(&summary);
        sink.emit(ProgressEvent::BatchFinished {
            summary: summary.clone(),
        });
        summary
    }
}

// ========== 日志辅助函数 ==========

fn log_batch_start(total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批处理，共 {} 行", total);
    info!("{}", "=".repeat(60));
}

fn log_batch_complete(summary: &BatchSummary) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 批处理结束: 成功 {}/{}，失败 {}，跳过 {}，未执行 {}",
        summary.succeeded, summary.total, summary.failed, summary.skipped, summary.not_attempted
    );
    if summary.untagged > 0 {
        warn!("⚠️ 其中 {} 个文件已下载但未写入元数据", summary.untagged);
    }
    for e in &summary.errors {
        warn!("  第 {} 行: {}", e.row, e.message);
    }
    info!("{}", "─".repeat(60));
}
