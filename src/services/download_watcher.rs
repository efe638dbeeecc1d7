//! 下载监控服务 - 业务能力层
//!
//! 只负责"发现并确认下载完成的文件"，不关心浏览器流程
//!
//! 判定规则：
//! - 只考虑任务开始前不存在的文件（快照之外）
//! - 多个候选时取创建时间最新的一个（尽力而为的区分，并非保证）
//! - 连续两次轮询大小相同且大于 0，并且可以独占打开，才算完成

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::error::{AppResult, DetectionError};
use crate::infrastructure::{completion_signal, CompletionNotifier, CompletionSignal};
use crate::services::traits::{DirSnapshot, DownloadWatcher};

/// 基于轮询的下载监控
pub struct PollingWatcher {
    poll_interval: Duration,
}

impl PollingWatcher {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for PollingWatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl DownloadWatcher for PollingWatcher {
    fn snapshot(&self, dir: &Path, extension: &str) -> AppResult<DirSnapshot> {
        let files = list_matching(dir, extension).map_err(|e| DetectionError::WatchFailed {
            dir: dir.to_path_buf(),
            source: e,
        })?;
        debug!("下载目录快照: {} 个已有文件", files.len());
        Ok(files.into_iter().map(|f| f.path).collect())
    }

    fn watch(
        &self,
        dir: &Path,
        extension: &str,
        exclude: DirSnapshot,
        timeout: Duration,
    ) -> CompletionSignal {
        let (notifier, signal) = completion_signal();
        let task = tokio::spawn(watch_loop(
            dir.to_path_buf(),
            extension.to_string(),
            exclude,
            self.poll_interval,
            timeout,
            notifier,
        ));
        signal.attach(task)
    }
}

async fn watch_loop(
    dir: PathBuf,
    extension: String,
    exclude: DirSnapshot,
    poll_interval: Duration,
    timeout: Duration,
    notifier: CompletionNotifier,
) {
    let deadline = Instant::now() + timeout;
    let mut tracker = StabilityTracker::default();

    loop {
        if notifier.is_closed() {
            return;
        }

        match newest_candidate(&dir, &extension, &exclude) {
            Ok(Some(candidate)) => {
                if tracker.observe(&candidate.path, candidate.size) {
                    if can_open_exclusively(&candidate.path) {
                        info!("✓ 下载完成: {}", candidate.path.display());
                        notifier.complete(candidate.path);
                        return;
                    }
                    debug!("文件仍被占用: {}", candidate.path.display());
                }
            }
            Ok(None) => {}
            Err(e) => warn!("读取下载目录失败 {}: {}", dir.display(), e),
        }

        if Instant::now() >= deadline {
            warn!("⚠️ {} 秒内未检测到下载完成的文件", timeout.as_secs());
            notifier.timed_out();
            return;
        }

        sleep(poll_interval).await;
    }
}

/// 连续两次观察到相同大小才算稳定
#[derive(Debug, Default)]
pub struct StabilityTracker {
    last: Option<(PathBuf, u64)>,
}

impl StabilityTracker {
    /// 记录一次观察，返回文件是否已稳定
    pub fn observe(&mut self, path: &Path, size: u64) -> bool {
        let stable = matches!(&self.last, Some((p, s)) if p == path && *s == size && size > 0);
        self.last = Some((path.to_path_buf(), size));
        stable
    }
}

#[derive(Debug)]
struct FileEntry {
    path: PathBuf,
    size: u64,
    created: SystemTime,
}

fn list_matching(dir: &Path, extension: &str) -> std::io::Result<Vec<FileEntry>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }
        // 文件可能在遍历过程中被移走
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(FileEntry {
            path,
            size: metadata.len(),
            created,
        });
    }
    Ok(files)
}

/// 快照之外最新创建的候选文件
fn newest_candidate(
    dir: &Path,
    extension: &str,
    exclude: &DirSnapshot,
) -> std::io::Result<Option<FileEntry>> {
    Ok(list_matching(dir, extension)?
        .into_iter()
        .filter(|f| !exclude.contains(&f.path))
        .max_by_key(|f| f.created))
}

#[cfg(windows)]
fn can_open_exclusively(path: &Path) -> bool {
    use std::os::windows::fs::OpenOptionsExt;
    fs::OpenOptions::new().read(true).share_mode(0).open(path).is_ok()
}

#[cfg(not(windows))]
fn can_open_exclusively(path: &Path) -> bool {
    fs::File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SignalOutcome;

    #[test]
    fn growing_file_is_stable_only_after_equal_pair() {
        let path = Path::new("/dl/song.mp3");
        let mut tracker = StabilityTracker::default();

        assert!(!tracker.observe(path, 100));
        assert!(!tracker.observe(path, 200));
        assert!(!tracker.observe(path, 300));
        assert!(tracker.observe(path, 300));
    }

    #[test]
    fn first_observation_is_never_stable() {
        let mut tracker = StabilityTracker::default();
        assert!(!tracker.observe(Path::new("/dl/a.mp3"), 10));
    }

    #[test]
    fn switching_candidate_restarts_tracking() {
        let mut tracker = StabilityTracker::default();
        assert!(!tracker.observe(Path::new("/dl/a.mp3"), 10));
        assert!(!tracker.observe(Path::new("/dl/b.mp3"), 10));
        assert!(tracker.observe(Path::new("/dl/b.mp3"), 10));
    }

    #[test]
    fn empty_file_never_counts_as_stable() {
        let mut tracker = StabilityTracker::default();
        assert!(!tracker.observe(Path::new("/dl/a.mp3"), 0));
        assert!(!tracker.observe(Path::new("/dl/a.mp3"), 0));
    }

    #[test]
    fn snapshot_lists_matching_extension_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.mp3"), b"x").unwrap();
        fs::write(dir.path().join("b.MP3"), b"x").unwrap();
        fs::write(dir.path().join("c.mp3.crdownload"), b"x").unwrap();
        fs::write(dir.path().join("d.txt"), b"x").unwrap();

        let snapshot = PollingWatcher::default().snapshot(dir.path(), "mp3").unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains(&dir.path().join("a.mp3")));
        assert!(snapshot.contains(&dir.path().join("b.MP3")));
    }

    #[test]
    fn snapshot_of_missing_dir_is_watch_error() {
        let err = PollingWatcher::default()
            .snapshot(Path::new("/definitely/not/here"), "mp3")
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Detection(DetectionError::WatchFailed { .. })));
    }

    #[tokio::test]
    async fn selects_file_absent_from_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.mp3");
        fs::write(&old, vec![1u8; 64]).unwrap();

        let watcher = PollingWatcher::new(Duration::from_millis(20));
        let snapshot = watcher.snapshot(dir.path(), "mp3").unwrap();

        let new = dir.path().join("new.mp3");
        fs::write(&new, vec![2u8; 128]).unwrap();
        // 旧文件更新得更晚，也不能被选中
        fs::write(&old, vec![1u8; 256]).unwrap();

        let signal = watcher.watch(dir.path(), "mp3", snapshot, Duration::from_secs(5));
        let outcome = signal.wait(Duration::from_secs(5)).await;
        assert_eq!(outcome, SignalOutcome::Completed(new));
    }

    #[tokio::test]
    async fn reports_timeout_when_nothing_arrives() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = PollingWatcher::new(Duration::from_millis(10));

        let signal = watcher.watch(dir.path(), "mp3", DirSnapshot::new(), Duration::from_millis(100));
        let outcome = signal.wait(Duration::from_secs(5)).await;
        assert_eq!(outcome, SignalOutcome::TimedOut);
    }

    #[tokio::test]
    async fn waits_for_growing_file_to_settle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growing.mp3");
        let watcher = PollingWatcher::new(Duration::from_millis(30));

        let signal = watcher.watch(dir.path(), "mp3", DirSnapshot::new(), Duration::from_secs(5));

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            for chunk in 1..=5usize {
                fs::write(&writer_path, vec![0u8; chunk * 100]).unwrap();
                sleep(Duration::from_millis(10)).await;
            }
        });

        let outcome = signal.wait(Duration::from_secs(5)).await;
        writer.await.unwrap();

        assert_eq!(outcome, SignalOutcome::Completed(path.clone()));
        assert_eq!(fs::metadata(&path).unwrap().len(), 500);
    }
}
