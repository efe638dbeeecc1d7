//! 后台工作线程
//!
//! 界面线程只做三件事：提交、取消、读取事件 / 快照。
//! 所有浏览器、文件和标签操作都在唯一的工作线程上顺序执行，
//! 因此任意时刻最多只有一个浏览器会话。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{BatchSnapshot, JobDescriptor, JobDraft};
use crate::orchestrator::batch_processor::{BatchProcessor, CancelFlag};
use crate::orchestrator::events::{progress_channel, EventReceiver, ProgressEvent};
use crate::workflow::JobFlow;

enum WorkerCommand {
    RunJob(JobDescriptor),
    RunBatch(Vec<JobDraft>),
    Shutdown,
}

/// 工作线程句柄
pub struct Orchestrator {
    cmd_tx: mpsc::Sender<WorkerCommand>,
    events: EventReceiver,
    busy: Arc<AtomicBool>,
    cancel: CancelFlag,
    snapshots: watch::Receiver<BatchSnapshot>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Orchestrator {
    /// 启动工作线程
    pub fn spawn(flow: JobFlow) -> AppResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (sink, events) = progress_channel();
        let busy = Arc::new(AtomicBool::new(false));
        let cancel = CancelFlag::new();

        let processor = BatchProcessor::new(Arc::new(flow));
        let snapshots = processor.subscribe();

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(AppError::WorkerStart)?;

        let worker_busy = busy.clone();
        let worker_cancel = cancel.clone();
        let thread = thread::Builder::new()
            .name("ytmp3-worker".to_string())
            .spawn(move || {
                debug!("工作线程已启动");
                while let Ok(command) = cmd_rx.recv() {
                    let _guard = BusyGuard(worker_busy.clone());
                    match command {
                        WorkerCommand::RunJob(job) => {
                            runtime.block_on(processor.run_single(&job, &sink));
                        }
                        WorkerCommand::RunBatch(drafts) => {
                            runtime.block_on(processor.run_batch(drafts, &worker_cancel, &sink));
                        }
                        WorkerCommand::Shutdown => break,
                    }
                }
                debug!("工作线程已退出");
            })
            .map_err(AppError::WorkerStart)?;

        Ok(Self {
            cmd_tx,
            events,
            busy,
            cancel,
            snapshots,
            thread: Some(thread),
        })
    }

    /// 校验后提交单个任务；校验失败时什么都不会发生
    pub fn submit_job(&self, draft: &JobDraft) -> AppResult<()> {
        let job = draft.validate()?;
        self.acquire()?;
        info!("📨 已提交任务: {}", job);
        self.send(WorkerCommand::RunJob(job))
    }

    /// 提交一批任务；各行在工作线程上再校验
    pub fn submit_batch(&self, drafts: Vec<JobDraft>) -> AppResult<()> {
        self.acquire()?;
        self.cancel.reset();
        info!("📨 已提交批处理: {} 行", drafts.len());
        self.send(WorkerCommand::RunBatch(drafts))
    }

    /// 请求取消批处理，在当前行结束后生效
    pub fn cancel(&self) {
        if self.is_busy() {
            info!("⏹️ 已请求取消，当前任务完成后停止");
        }
        self.cancel.cancel();
    }

    /// 可以交给其他线程（例如 Ctrl+C 处理）的取消句柄
    pub fn cancel_handle(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// 最近一次发布的批处理快照
    pub fn snapshot(&self) -> BatchSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn try_recv(&self) -> Option<ProgressEvent> {
        self.events.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<ProgressEvent> {
        self.events.recv_timeout(timeout)
    }

    pub fn drain(&self) -> Vec<ProgressEvent> {
        self.events.drain()
    }

    /// 等待当前任务结束后退出工作线程
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn acquire(&self) -> AppResult<()> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| AppError::Busy)
    }

    fn send(&self, command: WorkerCommand) -> AppResult<()> {
        self.cmd_tx.send(command).map_err(|_| {
            self.busy.store(false, Ordering::SeqCst);
            AppError::WorkerGone
        })
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.cmd_tx.send(WorkerCommand::Shutdown);
            if thread.join().is_err() {
                warn!("工作线程异常退出");
            }
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 命令处理结束时清除忙碌标志
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
