use std::path::PathBuf;

use chrono::{DateTime, Local};

use crate::error::{AppError, FailureKind};

/// 单个任务的执行结果
#[derive(Debug, Clone)]
pub struct RunResult {
    pub success: bool,
    /// 仅成功时存在
    pub file_path: Option<PathBuf>,
    /// 仅失败时存在
    pub error_message: Option<String>,
    pub failure: Option<FailureKind>,
    pub finished_at: DateTime<Local>,
}

impl RunResult {
    pub fn succeeded(path: PathBuf) -> Self {
        Self {
            success: true,
            file_path: Some(path),
            error_message: None,
            failure: None,
            finished_at: Local::now(),
        }
    }

    pub fn failed(error: &AppError) -> Self {
        Self {
            success: false,
            file_path: None,
            error_message: Some(error.user_message()),
            failure: Some(error.failure_kind()),
            finished_at: Local::now(),
        }
    }

    /// 文件已下载但没有写入元数据
    pub fn is_untagged(&self) -> bool {
        matches!(self.failure, Some(FailureKind::Tagging { .. }))
    }

    /// 磁盘上存在的下载文件（包括写标签失败的情况）
    pub fn downloaded_file(&self) -> Option<&PathBuf> {
        match &self.failure {
            Some(FailureKind::Tagging { downloaded }) => Some(downloaded),
            _ => self.file_path.as_ref(),
        }
    }
}
