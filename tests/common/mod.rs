//! 测试用的内存协作者，记录调用顺序
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use yt_mp3_downloader::error::{AppError, AutomationError, TaggingError};
use yt_mp3_downloader::infrastructure::completion_signal;
use yt_mp3_downloader::services::{
    BrowserAutomation, BrowserSession, DirSnapshot, DownloadWatcher, TagMap, Tagger,
};
use yt_mp3_downloader::{CompletionSignal, FlowSettings, JobFlow, ProgressEvent, ProgressSink, TagFields};

pub const DOWNLOADED: &str = "/dl/converted.mp3";

/// 所有协作者共用的调用记录
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

// ========== 浏览器 ==========

pub struct MockBrowser {
    pub log: CallLog,
    /// 在该步骤失败："open" / "navigate" / "convert" / "download"
    pub fail_at: Option<&'static str>,
}

#[async_trait]
impl BrowserAutomation for MockBrowser {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, AppError> {
        self.log.push("open");
        if self.fail_at == Some("open") {
            return Err(AutomationError::LaunchFailed {
                reason: "no chrome".to_string(),
            }
            .into());
        }
        Ok(Box::new(MockSession {
            log: self.log.clone(),
            fail_at: self.fail_at,
            released: false,
        }))
    }
}

struct MockSession {
    log: CallLog,
    fail_at: Option<&'static str>,
    released: bool,
}

impl MockSession {
    fn step(&self, name: &'static str) -> Result<(), AppError> {
        self.log.push(name);
        if self.fail_at == Some(name) {
            return Err(AppError::element_not_found(name, "#mock"));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    async fn navigate_and_submit(&mut self, source_url: &str) -> Result<(), AppError> {
        self.step("navigate")?;
        // 链接中带 fail 的任务模拟网站错误
        if source_url.contains("fail") {
            return Err(AppError::navigation_failed(source_url, "connection reset"));
        }
        Ok(())
    }

    async fn trigger_conversion(&mut self) -> Result<(), AppError> {
        self.step("convert")
    }

    async fn trigger_download(&mut self) -> Result<(), AppError> {
        self.step("download")
    }

    async fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.log.push("release");
        }
    }
}

// ========== 下载监控 ==========

pub struct MockWatcher {
    pub log: CallLog,
    /// None 表示监控超时
    pub file: Option<PathBuf>,
    /// 模拟下载耗时
    pub delay: Duration,
}

impl DownloadWatcher for MockWatcher {
    fn snapshot(&self, _dir: &Path, _extension: &str) -> Result<DirSnapshot, AppError> {
        self.log.push("snapshot");
        Ok(DirSnapshot::new())
    }

    fn watch(
        &self,
        _dir: &Path,
        _extension: &str,
        _exclude: DirSnapshot,
        _timeout: Duration,
    ) -> CompletionSignal {
        self.log.push("watch");
        let (notifier, signal) = completion_signal();
        let log = self.log.clone();
        let file = self.file.clone();
        let delay = self.delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match file {
                Some(path) => {
                    log.push("detected");
                    notifier.complete(path);
                }
                None => {
                    log.push("watch-timeout");
                    notifier.timed_out();
                }
            }
        });
        signal.attach(task)
    }
}

// ========== 标签 ==========

#[derive(Default)]
pub struct MockTagger {
    pub log: CallLog,
    pub fail_write: bool,
    pub written: Mutex<Vec<TagFields>>,
}

impl Tagger for MockTagger {
    fn read_tags(&self, _path: &Path) -> Result<TagMap, AppError> {
        self.log.push("read_tags");
        Ok(TagMap::new())
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> Result<(), AppError> {
        self.log.push("write_tags");
        if self.fail_write {
            return Err(TaggingError::WriteFailed {
                path: path.to_path_buf(),
                reason: "disk full".to_string(),
            }
            .into());
        }
        self.written.lock().unwrap().push(fields.clone());
        Ok(())
    }

    fn backup(&self, path: &Path) -> Result<PathBuf, AppError> {
        self.log.push("backup");
        Ok(path.with_extension("mp3.backup"))
    }

    fn restore(&self, _backup: &Path, _target: &Path) -> Result<(), AppError> {
        self.log.push("restore");
        Ok(())
    }

    fn discard_backup(&self, _backup: &Path) -> Result<(), AppError> {
        self.log.push("discard_backup");
        Ok(())
    }
}

// ========== 事件 ==========

/// 收集全部事件
#[derive(Default)]
pub struct VecSink(pub Mutex<Vec<ProgressEvent>>);

impl VecSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl ProgressSink for VecSink {
    fn emit(&self, event: ProgressEvent) {
        self.0.lock().unwrap().push(event);
    }
}

// ========== 组装 ==========

pub fn settings() -> FlowSettings {
    FlowSettings {
        downloads_dir: PathBuf::from("/dl"),
        extension: "mp3".to_string(),
        conversion_wait: Duration::from_millis(5),
        download_timeout: Duration::from_secs(5),
        keep_backups: false,
    }
}

pub struct Harness {
    pub log: CallLog,
    pub tagger: Arc<MockTagger>,
    pub browser_fail_at: Option<&'static str>,
    pub file: Option<PathBuf>,
    pub delay: Duration,
    pub settings: FlowSettings,
}

impl Harness {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            tagger: Arc::new(MockTagger {
                log: log.clone(),
                ..MockTagger::default()
            }),
            log,
            browser_fail_at: None,
            file: Some(PathBuf::from(DOWNLOADED)),
            delay: Duration::from_millis(10),
            settings: settings(),
        }
    }

    pub fn failing_tagger(mut self) -> Self {
        self.tagger = Arc::new(MockTagger {
            log: self.log.clone(),
            fail_write: true,
            ..MockTagger::default()
        });
        self
    }

    pub fn flow(&self) -> JobFlow {
        JobFlow::new(
            Arc::new(MockBrowser {
                log: self.log.clone(),
                fail_at: self.browser_fail_at,
            }),
            Arc::new(MockWatcher {
                log: self.log.clone(),
                file: self.file.clone(),
                delay: self.delay,
            }),
            self.tagger.clone(),
            self.settings.clone(),
        )
    }
}
