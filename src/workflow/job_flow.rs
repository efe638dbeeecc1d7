//! 单任务处理流程 - 流程层
//!
//! 核心职责：定义"一个任务"的完整处理流程
//!
//! 流程顺序：
//! 1. 记录下载目录快照
//! 2. 浏览器：打开 → 填入链接 → 转换 → 固定等待 → 下载
//! 3. 等待完成信号（文件稳定或超时）
//! 4. 释放浏览器（只能在第 3 步之后，否则可能中断正在进行的下载）
//! 5. 备份 → 写入元数据，失败则从备份恢复

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::FlowSettings;
use crate::error::{AppResult, DetectionError};
use crate::infrastructure::SignalOutcome;
use crate::models::{JobDescriptor, RunResult};
use crate::orchestrator::events::{ProgressEvent, ProgressSink};
use crate::services::{BrowserAutomation, BrowserSession, DirSnapshot, DownloadWatcher, Tagger};
use crate::workflow::job_ctx::JobCtx;

/// 单任务处理流程
///
/// - 编排五个阶段的先后顺序
/// - 保证每条退出路径都会释放浏览器
/// - 不持有浏览器资源，每次运行向协作者申请新会话
/// - 所有错误都在这里转换为 `RunResult`
pub struct JobFlow {
    browser: Arc<dyn BrowserAutomation>,
    watcher: Arc<dyn DownloadWatcher>,
    tagger: Arc<dyn Tagger>,
    settings: FlowSettings,
}

impl JobFlow {
    pub fn new(
        browser: Arc<dyn BrowserAutomation>,
        watcher: Arc<dyn DownloadWatcher>,
        tagger: Arc<dyn Tagger>,
        settings: FlowSettings,
    ) -> Self {
        Self {
            browser,
            watcher,
            tagger,
            settings,
        }
    }

    pub async fn run(&self, job: &JobDescriptor, ctx: &JobCtx, sink: &dyn ProgressSink) -> RunResult {
        info!("{} 🎵 开始处理: {}", ctx, job);
        sink.emit(ProgressEvent::ProcessingStarted {
            row: ctx.row,
            label: job.to_string(),
        });

        match self.execute(job, ctx, sink).await {
            Ok(path) => {
                info!("{} ✅ 完成: {}", ctx, path.display());
                sink.emit(ProgressEvent::JobSucceeded { path: path.clone() });
                RunResult::succeeded(path)
            }
            Err(e) => {
                error!("{} ❌ {}", ctx, e);
                sink.emit(ProgressEvent::JobFailed {
                    reason: e.user_message(),
                    kind: e.failure_kind(),
                });
                RunResult::failed(&e)
            }
        }
    }

    async fn execute(
        &self,
        job: &JobDescriptor,
        ctx: &JobCtx,
        sink: &dyn ProgressSink,
    ) -> AppResult<PathBuf> {
        let settings = &self.settings;
        let snapshot = self
            .watcher
            .snapshot(&settings.downloads_dir, &settings.extension)?;

        let mut session = self.browser.open().await?;

        // ========== 浏览器 + 检测 ==========
        let downloaded = self.download(session.as_mut(), job, ctx, sink, snapshot).await;

        // ========== 释放浏览器（检测结束后，无论成败） ==========
        session.release().await;
        debug!("{} 浏览器已释放", ctx);

        let path = downloaded?;

        // ========== 元数据 ==========
        self.apply_metadata(&path, job, ctx, sink)?;
        Ok(path)
    }

    async fn download(
        &self,
        session: &mut dyn BrowserSession,
        job: &JobDescriptor,
        ctx: &JobCtx,
        sink: &dyn ProgressSink,
        snapshot: DirSnapshot,
    ) -> AppResult<PathBuf> {
        let settings = &self.settings;
        sink.emit(ProgressEvent::AutomationInProgress);

        info!("{} 🌐 提交视频链接...", ctx);
        session.navigate_and_submit(job.source_url()).await?;
        session.trigger_conversion().await?;

        info!(
            "{} ⏳ 等待转换 {} 秒...",
            ctx,
            settings.conversion_wait.as_secs()
        );
        sleep(settings.conversion_wait).await;

        session.trigger_download().await?;

        info!("{} 📥 等待下载完成...", ctx);
        sink.emit(ProgressEvent::WaitingForDownload);
        let signal = self.watcher.watch(
            &settings.downloads_dir,
            &settings.extension,
            snapshot,
            settings.download_timeout,
        );

        match signal.wait(settings.download_timeout).await {
            SignalOutcome::Completed(path) => Ok(path),
            SignalOutcome::TimedOut => Err(DetectionError::Timeout {
                dir: settings.downloads_dir.clone(),
                secs: settings.download_timeout.as_secs(),
            }
            .into()),
            SignalOutcome::Abandoned => Err(DetectionError::WatcherStopped.into()),
        }
    }

    fn apply_metadata(
        &self,
        path: &Path,
        job: &JobDescriptor,
        ctx: &JobCtx,
        sink: &dyn ProgressSink,
    ) -> AppResult<()> {
        info!("{} 🏷️ 写入元数据...", ctx);
        sink.emit(ProgressEvent::ApplyingMetadata {
            path: path.to_path_buf(),
        });

        match self.tagger.read_tags(path) {
            Ok(tags) if !tags.is_empty() => {
                let ids: Vec<&str> = tags.keys().map(String::as_str).collect();
                debug!("{} 原有标签: {}", ctx, ids.join(", "));
            }
            Ok(_) => debug!("{} 文件没有原有标签", ctx),
            Err(e) => debug!("{} 读取原有标签失败: {}", ctx, e),
        }

        let backup = self.tagger.backup(path)?;

        match self.tagger.write_tags(path, &job.tag_fields()) {
            Ok(()) => {
                if self.settings.keep_backups {
                    info!("{} 备份已保留: {}", ctx, backup.display());
                } else if let Err(e) = self.tagger.discard_backup(&backup) {
                    warn!("{} 删除备份失败: {}", ctx, e);
                }
                Ok(())
            }
            Err(e) => {
                if let Err(restore_err) = self.tagger.restore(&backup, path) {
                    error!(
                        "{} ⚠️ 恢复失败，原文件保存在备份中 {}: {}",
                        ctx,
                        backup.display(),
                        restore_err
                    );
                }
                Err(e)
            }
        }
    }
}
