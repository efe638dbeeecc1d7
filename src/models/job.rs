//! 任务描述
//!
//! `JobDraft` 是界面或表格行给出的原始输入，`JobDescriptor` 只能通过校验得到，
//! 构造后不可修改。

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::ValidationErrors;

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(www\.)?(youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)[\w-]+",
    )
    .expect("视频链接正则无效")
});

/// 判断字符串是否为可识别的视频链接
pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url.trim())
}

/// 解析音轨号，只接受正整数
pub fn parse_track_number(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

/// 原始任务输入（未校验）
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobDraft {
    /// 表格中的行号（从 1 开始，直接提交时为 None）
    #[serde(skip)]
    pub row: Option<usize>,
    pub source_url: String,
    pub artist: String,
    pub title: String,
    pub album: String,
    /// 保留原始文本，便于报告非数字输入
    pub track: String,
}

impl JobDraft {
    pub fn new(
        source_url: impl Into<String>,
        artist: impl Into<String>,
        title: impl Into<String>,
        album: impl Into<String>,
        track: impl ToString,
    ) -> Self {
        Self {
            row: None,
            source_url: source_url.into(),
            artist: artist.into(),
            title: title.into(),
            album: album.into(),
            track: track.to_string(),
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    /// 校验全部字段，错误会一次性收集
    pub fn validate(&self) -> Result<JobDescriptor, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if !is_video_url(&self.source_url) {
            errors.push("source_url", "视频链接格式无效，请输入有效的 YouTube 链接");
        }
        if self.artist.trim().is_empty() {
            errors.push("artist", "艺术家不能为空");
        }
        if self.title.trim().is_empty() {
            errors.push("title", "标题不能为空");
        }
        if self.album.trim().is_empty() {
            errors.push("album", "专辑不能为空");
        }
        let track = parse_track_number(&self.track);
        if track.is_none() {
            errors.push("track", "音轨号必须是正整数");
        }

        match track {
            Some(track) if errors.is_empty() => Ok(JobDescriptor {
                row: self.row,
                source_url: self.source_url.trim().to_string(),
                artist: self.artist.trim().to_string(),
                title: self.title.trim().to_string(),
                album: self.album.trim().to_string(),
                track,
            }),
            _ => Err(errors),
        }
    }
}

/// 已校验的任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    row: Option<usize>,
    source_url: String,
    artist: String,
    title: String,
    album: String,
    track: u32,
}

impl JobDescriptor {
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn album(&self) -> &str {
        &self.album
    }

    pub fn track(&self) -> u32 {
        self.track
    }

    /// 要写入文件的四个字段
    pub fn tag_fields(&self) -> TagFields {
        TagFields {
            artist: Some(self.artist.clone()),
            title: Some(self.title.clone()),
            album: Some(self.album.clone()),
            track: Some(self.track),
        }
    }
}

impl fmt::Display for JobDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({} #{})", self.artist, self.title, self.album, self.track)
    }
}

/// 要写入的标签，None 表示保留文件中原有的值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub track: Option<u32>,
}
