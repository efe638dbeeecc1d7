use std::collections::BTreeSet;

use toml::{Table, Value};

use crate::error::{AppResult, FileError};
use crate::models::job::JobDraft;
use crate::models::loaders::columns::ColumnMap;

/// 解析 TOML 批量文件
///
/// 文件格式为 `[[jobs]]` 数组，每项的键与表格列名规则相同。
pub fn parse_toml(content: &str, origin: &str) -> AppResult<Vec<JobDraft>> {
    let table: Table = toml::from_str(content).map_err(|e| FileError::ReadFailed {
        path: origin.to_string(),
        reason: e.to_string(),
    })?;

    let jobs = match table.get("jobs").and_then(Value::as_array) {
        Some(jobs) => jobs,
        None => {
            tracing::warn!("{} 中没有 [[jobs]] 项", origin);
            return Ok(Vec::new());
        }
    };

    let rows: Vec<&Table> = jobs.iter().filter_map(Value::as_table).collect();

    // 各项的键可能不完全相同，取并集后统一匹配
    let keys: BTreeSet<&str> = rows.iter().flat_map(|t| t.keys().map(String::as_str)).collect();
    let columns = ColumnMap::resolve(keys.iter().map(|k| (*k, k.to_string())))?;

    let drafts = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let field = |key: &String| row.get(key).map(value_to_text).unwrap_or_default();
            JobDraft::new(
                field(columns.url()),
                field(columns.artist()),
                field(columns.title()),
                field(columns.album()),
                field(columns.track()),
            )
            .at_row(index + 1)
        })
        .collect();

    Ok(drafts)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_jobs_array_with_integer_track() {
        let content = r#"
            [[jobs]]
            url = "https://youtu.be/abc123"
            Artist = "A"
            Title = "T"
            Album = "Al"
            track_number = 3

            [[jobs]]
            url = "https://youtu.be/def456"
            Artist = "B"
            Title = "U"
            Album = "Bl"
            track_number = "-1"
        "#;
        let drafts = parse_toml(content, "jobs.toml").unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].track, "3");
        assert!(drafts[0].validate().is_ok());
        assert_eq!(drafts[1].row, Some(2));
        assert!(drafts[1].validate().is_err());
    }

    #[test]
    fn file_without_jobs_is_empty() {
        assert!(parse_toml("title = \"x\"", "jobs.toml").unwrap().is_empty());
    }
}
