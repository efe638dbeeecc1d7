//! 表格列名匹配（不区分大小写，忽略空格和下划线）

use std::collections::HashMap;

use crate::error::FileError;

// 标准字段可接受的列名，按优先级排列
const URL_ALIASES: &[&str] = &["youtubeurl", "youtube_url", "youtube url", "sourceurl", "url"];
const ARTIST_ALIASES: &[&str] = &["artist"];
const TITLE_ALIASES: &[&str] = &["title"];
const ALBUM_ALIASES: &[&str] = &["album"];
const TRACK_ALIASES: &[&str] = &["tracknumber", "track_number", "track number", "track"];

pub fn normalize_column(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// 标准字段 → 原始列的位置
#[derive(Debug, Clone)]
pub struct ColumnMap<K> {
    url: K,
    artist: K,
    title: K,
    album: K,
    track: K,
}

impl<K: Clone> ColumnMap<K> {
    /// 从原始列名解析；任何必需列缺失都会报错
    pub fn resolve<'a, I>(columns: I) -> Result<Self, FileError>
    where
        I: IntoIterator<Item = (&'a str, K)>,
    {
        let normalized: HashMap<String, K> = columns
            .into_iter()
            .map(|(name, key)| (normalize_column(name), key))
            .collect();

        let find = |standard: &str, aliases: &[&str]| -> Result<K, FileError> {
            aliases
                .iter()
                .find_map(|alias| normalized.get(&normalize_column(alias)).cloned())
                .ok_or_else(|| FileError::MissingColumn {
                    column: standard.to_string(),
                    accepted: aliases.join(", "),
                })
        };

        Ok(Self {
            url: find("url", URL_ALIASES)?,
            artist: find("artist", ARTIST_ALIASES)?,
            title: find("title", TITLE_ALIASES)?,
            album: find("album", ALBUM_ALIASES)?,
            track: find("track", TRACK_ALIASES)?,
        })
    }

    pub fn url(&self) -> &K {
        &self.url
    }

    pub fn artist(&self) -> &K {
        &self.artist
    }

    pub fn title(&self) -> &K {
        &self.title
    }

    pub fn album(&self) -> &K {
        &self.album
    }

    pub fn track(&self) -> &K {
        &self.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_spaces_and_underscores() {
        assert_eq!(normalize_column(" YouTube_URL "), "youtubeurl");
        assert_eq!(normalize_column("Track Number"), "tracknumber");
    }

    #[test]
    fn resolves_aliases_case_insensitively() {
        let headers = ["ARTIST", "Title", "Youtube URL", "album", "Track_Number"];
        let map = ColumnMap::resolve(headers.iter().enumerate().map(|(i, h)| (*h, i))).unwrap();
        assert_eq!(*map.url(), 2);
        assert_eq!(*map.artist(), 0);
        assert_eq!(*map.track(), 4);
    }

    #[test]
    fn missing_column_lists_accepted_names() {
        let headers = ["url", "artist", "title", "album"];
        let err = ColumnMap::resolve(headers.iter().enumerate().map(|(i, h)| (*h, i))).unwrap_err();
        match err {
            FileError::MissingColumn { column, accepted } => {
                assert_eq!(column, "track");
                assert!(accepted.contains("tracknumber"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
