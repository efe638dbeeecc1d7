//! 下载完成信号 - 基础设施层
//!
//! 监控任务与流程之间的一次性交接：监控方最多设置一次，流程方最多等待一次。
//! 先设置后等待不会丢失结果；信号被丢弃时后台监控任务随之终止。

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// 监控方上报的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// 文件已稳定
    Completed(PathBuf),
    /// 监控方自己的超时
    TimedOut,
}

/// 等待方看到的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Completed(PathBuf),
    TimedOut,
    /// 监控方未设置就退出了
    Abandoned,
}

/// 创建一对完成信号
pub fn completion_signal() -> (CompletionNotifier, CompletionSignal) {
    let (tx, rx) = oneshot::channel();
    (
        CompletionNotifier { tx },
        CompletionSignal {
            rx,
            watcher: None,
        },
    )
}

/// 设置端（监控任务持有）
#[derive(Debug)]
pub struct CompletionNotifier {
    tx: oneshot::Sender<WatchOutcome>,
}

impl CompletionNotifier {
    pub fn complete(self, path: PathBuf) {
        self.notify(WatchOutcome::Completed(path));
    }

    pub fn timed_out(self) {
        self.notify(WatchOutcome::TimedOut);
    }

    fn notify(self, outcome: WatchOutcome) {
        if self.tx.send(outcome).is_err() {
            tracing::debug!("完成信号的等待方已丢弃");
        }
    }

    /// 等待方是否已经放弃
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 等待端（流程持有）
#[derive(Debug)]
pub struct CompletionSignal {
    rx: oneshot::Receiver<WatchOutcome>,
    watcher: Option<JoinHandle<()>>,
}

impl CompletionSignal {
    /// 绑定产生该信号的后台监控任务，信号丢弃时一并终止
    pub fn attach(mut self, watcher: JoinHandle<()>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// 等待结果，最长 `timeout`
    pub async fn wait(mut self, timeout: Duration) -> SignalOutcome {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(WatchOutcome::Completed(path))) => SignalOutcome::Completed(path),
            Ok(Ok(WatchOutcome::TimedOut)) => SignalOutcome::TimedOut,
            Ok(Err(_)) => SignalOutcome::Abandoned,
            Err(_) => SignalOutcome::TimedOut,
        }
    }
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}
