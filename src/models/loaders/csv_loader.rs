use crate::error::{AppResult, FileError};
use crate::models::job::JobDraft;
use crate::models::loaders::columns::ColumnMap;

/// 解析 CSV 内容为任务草稿列表
///
/// 行号从 1 开始（不含表头），空行会被丢弃但不影响后续行号。
pub fn parse_csv(content: &str, origin: &str) -> AppResult<Vec<JobDraft>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FileError::ReadFailed {
            path: origin.to_string(),
            reason: e.to_string(),
        })?
        .clone();

    let columns = ColumnMap::resolve(headers.iter().enumerate().map(|(i, h)| (h, i)))?;

    let mut drafts = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| FileError::ReadFailed {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let field = |i: &usize| record.get(*i).unwrap_or_default().to_string();
        drafts.push(
            JobDraft::new(
                field(columns.url()),
                field(columns.artist()),
                field(columns.title()),
                field(columns.album()),
                field(columns.track()),
            )
            .at_row(index + 1),
        );
    }

    Ok(drafts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn reads_rows_with_mixed_case_headers() {
        let content = "YouTube URL,Artist,TITLE,Album,Track Number\n\
                       https://youtu.be/abc123,A,T,Al,3\n\
                       ,,,,\n\
                       https://youtu.be/xyz,B,U,Bl,x\n";
        let drafts = parse_csv(content, "test.csv").unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0], JobDraft::new("https://youtu.be/abc123", "A", "T", "Al", "3").at_row(1));
        assert_eq!(drafts[1].row, Some(3));
        assert_eq!(drafts[1].track, "x");
    }

    #[test]
    fn short_rows_yield_empty_fields() {
        let content = "url,artist,title,album,track\nhttps://youtu.be/abc123,A\n";
        let drafts = parse_csv(content, "test.csv").unwrap();
        assert_eq!(drafts[0].title, "");
        assert!(drafts[0].validate().is_err());
    }

    #[test]
    fn missing_column_fails_whole_file() {
        let content = "url,artist,title\nhttps://youtu.be/abc123,A,T\n";
        let err = parse_csv(content, "test.csv").unwrap_err();
        assert!(matches!(err, AppError::File(FileError::MissingColumn { .. })));
    }
}
