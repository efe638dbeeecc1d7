pub mod columns;
pub mod csv_loader;
pub mod toml_loader;

use std::path::Path;

use tokio::fs;

use crate::error::{AppResult, FileError};
use crate::models::job::JobDraft;

pub use csv_loader::parse_csv;
pub use toml_loader::parse_toml;

/// 根据扩展名加载批量文件（.csv / .toml），返回未校验的任务草稿
pub async fn load_batch_file(path: &Path) -> AppResult<Vec<JobDraft>> {
    let origin = path.display().to_string();

    if !path.exists() {
        return Err(FileError::NotFound { path: origin }.into());
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FileError::ReadFailed {
            path: origin.clone(),
            reason: e.to_string(),
        })?;

    let drafts = match extension.as_str() {
        "csv" => parse_csv(&content, &origin)?,
        "toml" => parse_toml(&content, &origin)?,
        _ => return Err(FileError::UnsupportedFormat { path: origin }.into()),
    };

    tracing::info!(
        "成功加载 {} 行: {}",
        drafts.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(drafts)
}
