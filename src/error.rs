use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 输入校验错误（任务未开始）
    #[error("输入校验失败: {0}")]
    Validation(#[from] ValidationErrors),
    /// 浏览器自动化错误
    #[error("浏览器错误: {0}")]
    Automation(#[from] AutomationError),
    /// 下载检测错误
    #[error("下载检测错误: {0}")]
    Detection(#[from] DetectionError),
    /// 元数据写入错误
    #[error("元数据错误: {0}")]
    Tagging(#[from] TaggingError),
    /// 批量文件错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 批处理在两行之间被取消
    #[error("批处理已取消")]
    Cancelled,
    /// 已有任务在执行
    #[error("已有下载任务正在进行，请等待其完成")]
    Busy,
    /// 后台线程已退出
    #[error("后台工作线程已退出")]
    WorkerGone,
    /// 无法启动后台线程或其运行时
    #[error("无法启动后台工作线程: {0}")]
    WorkerStart(#[source] std::io::Error),
}

/// 单个字段的校验错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// 一次校验收集到的全部错误
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message.as_str()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// 浏览器自动化错误
#[derive(Debug, Error)]
pub enum AutomationError {
    /// 启动或连接浏览器失败
    #[error("无法启动浏览器: {reason}")]
    LaunchFailed { reason: String },
    /// 页面导航失败（通常是网络问题）
    #[error("导航到 {url} 失败，请检查网络连接: {reason}")]
    NavigationFailed { url: String, reason: String },
    /// 找不到页面元素（网站可能已改版）
    #[error("找不到{element} ({locator})，网站可能已改版")]
    ElementNotFound { element: String, locator: String },
    /// 某一步骤超时
    #[error("{step} 超时 ({secs} 秒)")]
    Timeout { step: String, secs: u64 },
    /// 页面操作失败
    #[error("页面操作失败 ({step}): {reason}")]
    Interaction { step: String, reason: String },
    /// 会话已释放
    #[error("浏览器会话已关闭")]
    SessionClosed,
}

/// 下载检测错误
#[derive(Debug, Error)]
pub enum DetectionError {
    /// 超时未检测到稳定文件
    #[error("{secs} 秒内未在 {dir} 检测到下载完成的文件")]
    Timeout { dir: PathBuf, secs: u64 },
    /// 无法读取监控目录
    #[error("无法读取下载目录 {dir}: {source}")]
    WatchFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 监控任务提前退出
    #[error("下载监控已停止")]
    WatcherStopped,
}

/// 元数据写入错误
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("文件不存在: {path}")]
    NotFound { path: PathBuf },
    #[error("不是有效的 MP3 文件: {path}")]
    InvalidMp3 { path: PathBuf },
    #[error("创建备份失败 ({path}): {reason}")]
    BackupFailed { path: PathBuf, reason: String },
    #[error("读取标签失败 ({path}): {reason}")]
    ReadFailed { path: PathBuf, reason: String },
    #[error("写入标签失败 ({path}): {reason}")]
    WriteFailed { path: PathBuf, reason: String },
    #[error("从备份恢复失败 ({path}): {reason}")]
    RestoreFailed { path: PathBuf, reason: String },
}

impl TaggingError {
    /// 出问题的文件
    pub fn path(&self) -> &PathBuf {
        match self {
            TaggingError::NotFound { path }
            | TaggingError::InvalidMp3 { path }
            | TaggingError::BackupFailed { path, .. }
            | TaggingError::ReadFailed { path, .. }
            | TaggingError::WriteFailed { path, .. }
            | TaggingError::RestoreFailed { path, .. } => path,
        }
    }
}

/// 批量文件错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    #[error("读取文件失败 ({path}): {reason}")]
    ReadFailed { path: String, reason: String },
    #[error("不支持的文件类型: {path}")]
    UnsupportedFormat { path: String },
    #[error("缺少必需的列 '{column}'，可接受的列名: {accepted}")]
    MissingColumn { column: String, accepted: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("配置文件解析失败 ({path}): {source}")]
    ParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 错误分类 ==========

/// 任务失败的类别，供界面区分文件处于什么状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// 什么都没发生
    Validation,
    /// 下载失败（浏览器阶段）
    Automation,
    /// 下载失败（未检测到文件）
    DetectionTimeout,
    /// 文件已保存，但元数据写入失败
    Tagging { downloaded: PathBuf },
    /// 被取消
    Cancelled,
    /// 其他内部错误
    Internal,
}

impl AppError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AppError::Validation(_) => FailureKind::Validation,
            AppError::Automation(_) => FailureKind::Automation,
            AppError::Detection(_) => FailureKind::DetectionTimeout,
            AppError::Tagging(e) => FailureKind::Tagging {
                downloaded: e.path().clone(),
            },
            AppError::Cancelled => FailureKind::Cancelled,
            AppError::File(_)
            | AppError::Config(_)
            | AppError::Busy
            | AppError::WorkerGone
            | AppError::WorkerStart(_) => FailureKind::Internal,
        }
    }

    /// 面向用户的提示，说明文件当前处于什么状态
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => format!("未执行任何操作，输入有误: {}", e),
            AppError::Automation(e) => format!("下载失败: {}", e),
            AppError::Detection(e) => format!("下载失败: {}", e),
            AppError::Tagging(e) => format!(
                "文件已保存到 {}，但元数据写入失败: {}",
                e.path().display(),
                e
            ),
            AppError::Cancelled => "批处理已取消".to_string(),
            other => other.to_string(),
        }
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建元素未找到错误
    pub fn element_not_found(element: impl Into<String>, locator: impl Into<String>) -> Self {
        AppError::Automation(AutomationError::ElementNotFound {
            element: element.into(),
            locator: locator.into(),
        })
    }

    /// 创建导航失败错误
    pub fn navigation_failed(url: impl Into<String>, reason: impl fmt::Display) -> Self {
        AppError::Automation(AutomationError::NavigationFailed {
            url: url.into(),
            reason: reason.to_string(),
        })
    }

    /// 创建页面操作失败错误
    pub fn interaction_failed(step: impl Into<String>, reason: impl fmt::Display) -> Self {
        AppError::Automation(AutomationError::Interaction {
            step: step.into(),
            reason: reason.to_string(),
        })
    }

    /// 创建标签写入失败错误
    pub fn tag_write_failed(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        AppError::Tagging(TaggingError::WriteFailed {
            path: path.into(),
            reason: reason.to_string(),
        })
    }
}

impl From<chromiumoxide::error::CdpError> for AutomationError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AutomationError::Interaction {
            step: "cdp".to_string(),
            reason: err.to_string(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_distinguish_file_state() {
        let mut invalid = ValidationErrors::default();
        invalid.push("artist", "艺术家不能为空");
        let nothing = AppError::from(invalid).user_message();
        assert!(nothing.starts_with("未执行任何操作"));

        let download = AppError::from(DetectionError::Timeout {
            dir: PathBuf::from("/dl"),
            secs: 60,
        })
        .user_message();
        assert!(download.starts_with("下载失败"));

        let untagged = AppError::tag_write_failed("/dl/song.mp3", "磁盘已满").user_message();
        assert!(untagged.starts_with("文件已保存到 /dl/song.mp3"));
    }

    #[test]
    fn tagging_failure_kind_keeps_downloaded_path() {
        let err = AppError::tag_write_failed("/dl/song.mp3", "boom");
        assert_eq!(
            err.failure_kind(),
            FailureKind::Tagging {
                downloaded: PathBuf::from("/dl/song.mp3")
            }
        );
    }

    #[test]
    fn validation_errors_join_messages() {
        let mut errors = ValidationErrors::default();
        errors.push("artist", "a");
        errors.push("title", "b");
        assert_eq!(errors.to_string(), "a; b");
        assert!(errors.has_field("title"));
        assert_eq!(errors.len(), 2);
    }
}
