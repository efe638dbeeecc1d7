//! 外部协作者接口
//!
//! 流程层只依赖这些接口，具体实现（浏览器 / 文件系统 / 标签库）可替换。

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::infrastructure::CompletionSignal;
use crate::models::TagFields;

/// 任务开始前目录中已存在的文件
pub type DirSnapshot = HashSet<PathBuf>;

/// 帧 ID → 文本内容
pub type TagMap = BTreeMap<String, String>;

/// 浏览器协作者：每个任务打开一个会话
#[async_trait]
pub trait BrowserAutomation: Send + Sync {
    async fn open(&self) -> AppResult<Box<dyn BrowserSession>>;
}

/// 一次浏览器会话
#[async_trait]
pub trait BrowserSession: Send {
    /// 打开转换网站并填入视频链接
    async fn navigate_and_submit(&mut self, source_url: &str) -> AppResult<()>;

    /// 点击转换
    async fn trigger_conversion(&mut self) -> AppResult<()>;

    /// 点击下载
    async fn trigger_download(&mut self) -> AppResult<()>;

    /// 释放浏览器资源；可重复调用，失败后调用也安全
    async fn release(&mut self);
}

/// 文件系统协作者
pub trait DownloadWatcher: Send + Sync {
    /// 记录目录中已有的目标文件
    fn snapshot(&self, dir: &Path, extension: &str) -> AppResult<DirSnapshot>;

    /// 开始监控，文件稳定或超时后设置信号；需在 tokio 运行时内调用
    fn watch(
        &self,
        dir: &Path,
        extension: &str,
        exclude: DirSnapshot,
        timeout: Duration,
    ) -> CompletionSignal;
}

/// 标签协作者
pub trait Tagger: Send + Sync {
    fn read_tags(&self, path: &Path) -> AppResult<TagMap>;

    /// 写入给定字段，未给出的字段保持原样
    fn write_tags(&self, path: &Path, fields: &TagFields) -> AppResult<()>;

    /// 备份原文件，返回备份路径
    fn backup(&self, path: &Path) -> AppResult<PathBuf>;

    /// 用备份覆盖目标文件
    fn restore(&self, backup: &Path, target: &Path) -> AppResult<()>;

    /// 删除不再需要的备份
    fn discard_backup(&self, backup: &Path) -> AppResult<()>;
}
