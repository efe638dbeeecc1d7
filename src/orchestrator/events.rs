//! 进度 / 错误事件通道
//!
//! 工作线程只负责发送，界面线程自己决定何时取出事件，
//! 两边的节奏互不影响。

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use crate::error::FailureKind;
use crate::models::{BatchSnapshot, BatchSummary};

/// 编排器发出的状态事件
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// 开始处理一个任务
    ProcessingStarted {
        /// 表格行号（直接提交的任务为 None）
        row: Option<usize>,
        label: String,
    },
    /// 正在操作转换网站
    AutomationInProgress,
    /// 已点击下载，等待文件出现
    WaitingForDownload,
    /// 文件已下载，正在写入元数据
    ApplyingMetadata { path: PathBuf },
    JobSucceeded { path: PathBuf },
    JobFailed { reason: String, kind: FailureKind },
    /// 第 `index` 行（从 1 开始）处理完毕
    BatchProgress {
        index: usize,
        total: usize,
        snapshot: BatchSnapshot,
    },
    BatchFinished { summary: BatchSummary },
}

/// 事件接收端口
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// 把事件放进队列的实现
#[derive(Debug, Clone)]
pub struct ChannelProgressSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("事件接收方已关闭，丢弃事件");
        }
    }
}

/// 丢弃所有事件
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// 界面线程持有的接收端
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::Receiver<ProgressEvent>,
}

impl EventReceiver {
    /// 不阻塞地取一个事件
    pub fn try_recv(&self) -> Option<ProgressEvent> {
        self.rx.try_recv().ok()
    }

    /// 最多等待 `timeout`
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// 取出当前队列中的全部事件
    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.rx.try_iter().collect()
    }
}

pub fn progress_channel() -> (ChannelProgressSink, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (ChannelProgressSink { tx }, EventReceiver { rx })
}
