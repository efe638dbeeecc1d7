//! 批处理状态
//!
//! `BatchState` 只由批处理线程修改；界面只能拿到整体替换的 `BatchSnapshot`。

use crate::models::run_result::RunResult;

/// 批处理状态机：Idle → Running → {Completed, Cancelled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// 某一行的错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 表格行号（从 1 开始）
    pub row: usize,
    pub message: String,
}

/// 批处理进度快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSnapshot {
    pub status: BatchStatus,
    pub total: usize,
    /// 已处理的行数（包括跳过的行）
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// 失败中属于"已下载但未写入元数据"的数量
    pub untagged: usize,
}

/// 批处理最终统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub status: BatchStatus,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub untagged: usize,
    /// 因取消而没有执行的行
    pub not_attempted: usize,
    pub errors: Vec<RowError>,
}

impl BatchSummary {
    /// 实际执行过的任务数（不含跳过的行）
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn completed_rows(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }

    /// 结束时的最后一个快照
    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            status: self.status,
            total: self.total,
            processed: self.completed_rows(),
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            untagged: self.untagged,
        }
    }
}

/// 批处理内部状态
#[derive(Debug, Default)]
pub struct BatchState {
    status: BatchStatus,
    total: usize,
    current_index: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    untagged: usize,
    errors: Vec<RowError>,
}

impl BatchState {
    pub fn start(total: usize) -> Self {
        Self {
            status: BatchStatus::Running,
            total,
            ..Self::default()
        }
    }

    pub fn status(&self) -> BatchStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn record_skipped(&mut self, row: usize, message: impl Into<String>) {
        self.skipped += 1;
        self.errors.push(RowError {
            row,
            message: message.into(),
        });
        self.current_index += 1;
    }

    pub fn record_result(&mut self, row: usize, result: &RunResult) {
        if result.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            if result.is_untagged() {
                self.untagged += 1;
            }
            self.errors.push(RowError {
                row,
                message: result
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "未知错误".to_string()),
            });
        }
        self.current_index += 1;
    }

    pub fn cancel(&mut self) {
        self.status = BatchStatus::Cancelled;
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        BatchSnapshot {
            status: self.status,
            total: self.total,
            processed: self.current_index,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            untagged: self.untagged,
        }
    }

    /// 结束批处理并生成统计；状态被消耗
    pub fn finish(mut self) -> BatchSummary {
        if self.status == BatchStatus::Running {
            self.status = BatchStatus::Completed;
        }
        BatchSummary {
            status: self.status,
            total: self.total,
            succeeded: self.succeeded,
            failed: self.failed,
            skipped: self.skipped,
            untagged: self.untagged,
            not_attempted: self.total - self.current_index,
            errors: self.errors,
        }
    }
}
