//! ID3 标签服务 - 业务能力层
//!
//! 写入流程：校验 → 复制到临时文件 → 在临时文件上写标签 → 再次校验 → 原子替换。
//! 原文件在替换之前始终完整。

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Local;
use id3::{Tag, TagLike, Version};
use tracing::{debug, info, warn};

use crate::error::{AppResult, TaggingError};
use crate::models::TagFields;
use crate::services::traits::{TagMap, Tagger};

/// 小于该大小的文件不可能是完整的 MP3
const MIN_MP3_SIZE: u64 = 1024;

/// 基于 id3 库的标签实现
#[derive(Debug, Default, Clone)]
pub struct Id3Tagger;

impl Id3Tagger {
    pub fn new() -> Self {
        Self
    }
}

impl Tagger for Id3Tagger {
    fn read_tags(&self, path: &Path) -> AppResult<TagMap> {
        ensure_mp3(path)?;
        let tag = match read_existing(path) {
            Ok(Some(tag)) => tag,
            Ok(None) => return Ok(TagMap::new()),
            Err(e) => {
                return Err(TaggingError::ReadFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
                .into())
            }
        };

        let mut map = TagMap::new();
        for frame in tag.frames() {
            let value = match frame.content().text() {
                Some(text) => text.to_string(),
                None => format!("<{}>", frame.id()),
            };
            map.entry(frame.id().to_string()).or_insert(value);
        }
        Ok(map)
    }

    fn write_tags(&self, path: &Path, fields: &TagFields) -> AppResult<()> {
        ensure_mp3(path)?;

        let tmp = temp_path(path);
        let result = write_via_temp(path, &tmp, fields);
        if result.is_err() && tmp.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                warn!("清理临时文件失败 {}: {}", tmp.display(), e);
            }
        }
        result?;

        info!("✓ 元数据已写入: {}", path.display());
        Ok(())
    }

    fn backup(&self, path: &Path) -> AppResult<PathBuf> {
        ensure_mp3(path)?;

        let backup = backup_path(path);
        let backup_failed = |reason: String| TaggingError::BackupFailed {
            path: path.to_path_buf(),
            reason,
        };

        let copied = fs::copy(path, &backup).map_err(|e| backup_failed(e.to_string()))?;
        let original = fs::metadata(path)
            .map_err(|e| backup_failed(e.to_string()))?
            .len();
        if copied != original {
            // 不完整的备份没有意义
            let _ = fs::remove_file(&backup);
            return Err(backup_failed(format!("备份大小不一致 ({} / {} 字节)", copied, original)).into());
        }

        debug!("已创建备份: {}", backup.display());
        Ok(backup)
    }

    fn restore(&self, backup: &Path, target: &Path) -> AppResult<()> {
        if !backup.exists() {
            return Err(TaggingError::RestoreFailed {
                path: target.to_path_buf(),
                reason: format!("备份不存在: {}", backup.display()),
            }
            .into());
        }
        fs::rename(backup, target).map_err(|e| TaggingError::RestoreFailed {
            path: target.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!("↩️ 已从备份恢复: {}", target.display());
        Ok(())
    }

    fn discard_backup(&self, backup: &Path) -> AppResult<()> {
        if backup.exists() {
            fs::remove_file(backup).map_err(|e| TaggingError::BackupFailed {
                path: backup.to_path_buf(),
                reason: e.to_string(),
            })?;
            debug!("已删除备份: {}", backup.display());
        }
        Ok(())
    }
}

// ========== 内部实现 ==========

fn write_via_temp(path: &Path, tmp: &Path, fields: &TagFields) -> AppResult<()> {
    let write_failed = |reason: String| TaggingError::WriteFailed {
        path: path.to_path_buf(),
        reason,
    };

    fs::copy(path, tmp).map_err(|e| write_failed(format!("复制到临时文件失败: {}", e)))?;

    let existing = read_existing(tmp).map_err(|e| write_failed(e.to_string()))?;
    let version = existing.as_ref().map(Tag::version).unwrap_or(Version::Id3v24);
    let mut tag = existing.unwrap_or_default();

    if let Some(artist) = &fields.artist {
        tag.set_artist(artist.as_str());
    }
    if let Some(title) = &fields.title {
        tag.set_title(title.as_str());
    }
    if let Some(album) = &fields.album {
        tag.set_album(album.as_str());
    }
    if let Some(track) = fields.track {
        tag.set_track(track);
    }

    tag.write_to_path(tmp, version)
        .map_err(|e| write_failed(e.to_string()))?;

    if !looks_like_mp3(tmp).map_err(|e| write_failed(e.to_string()))? {
        return Err(write_failed("写入后的文件校验失败".to_string()).into());
    }

    fs::rename(tmp, path).map_err(|e| write_failed(format!("替换原文件失败: {}", e)))?;
    Ok(())
}

/// 读取已有标签；文件没有标签时返回 None
fn read_existing(path: &Path) -> id3::Result<Option<Tag>> {
    match Tag::read_from_path(path) {
        Ok(tag) => Ok(Some(tag)),
        Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => Ok(None),
        Err(e) => Err(e),
    }
}

fn ensure_mp3(path: &Path) -> Result<(), TaggingError> {
    if !path.is_file() {
        return Err(TaggingError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let is_mp3_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mp3"));
    let valid = is_mp3_ext
        && looks_like_mp3(path).map_err(|e| TaggingError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !valid {
        return Err(TaggingError::InvalidMp3 {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// 大小足够，并且以 ID3 头或 MPEG 帧同步开头
fn looks_like_mp3(path: &Path) -> std::io::Result<bool> {
    if fs::metadata(path)?.len() < MIN_MP3_SIZE {
        return Ok(false);
    }
    let mut header = [0u8; 3];
    fs::File::open(path)?.read_exact(&mut header)?;
    Ok(&header == b"ID3" || (header[0] == 0xFF && header[1] & 0xE0 == 0xE0))
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tagging", name))
}

/// `<文件名>.backup.<时间戳>`，同一秒内重复时追加序号
fn backup_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let base = path.with_file_name(format!("{}.backup.{}", name, stamp));
    if !base.exists() {
        return base;
    }
    (1..)
        .map(|n| path.with_file_name(format!("{}.backup.{}_{}", name, stamp, n)))
        .find(|p| !p.exists())
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use id3::frame::Comment;
    use tempfile::TempDir;

    /// 一段以帧同步开头的伪音频
    fn audio_bytes() -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFB, 0x90, 0x64];
        bytes.extend(std::iter::repeat(0x55).take(4092));
        bytes
    }

    fn tagged_mp3(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("song.mp3");
        fs::write(&path, audio_bytes()).unwrap();

        let mut tag = Tag::new();
        tag.set_artist("Old Artist");
        tag.set_title("Old Title");
        tag.set_album("Old Album");
        tag.set_genre("Rock");
        tag.set_track(9);
        tag.add_frame(Comment {
            lang: "eng".to_string(),
            description: String::new(),
            text: "keep me".to_string(),
        });
        tag.write_to_path(&path, Version::Id3v24).unwrap();
        path
    }

    #[test]
    fn writing_only_artist_preserves_everything_else() {
        let dir = tempfile::tempdir().unwrap();
        let path = tagged_mp3(&dir);
        let before = Tag::read_from_path(&path).unwrap();

        let fields = TagFields {
            artist: Some("New Artist".to_string()),
            ..TagFields::default()
        };
        Id3Tagger::new().write_tags(&path, &fields).unwrap();

        let after = Tag::read_from_path(&path).unwrap();
        assert_eq!(after.artist(), Some("New Artist"));

        let others_before: Vec<_> = before.frames().filter(|f| f.id() != "TPE1").collect();
        let others_after: Vec<_> = after.frames().filter(|f| f.id() != "TPE1").collect();
        assert_eq!(others_before.len(), others_after.len());
        for frame in others_before {
            assert!(others_after.contains(&frame), "丢失帧 {}", frame.id());
        }

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.ends_with(&audio_bytes()));
    }

    #[test]
    fn writes_all_four_fields_into_untagged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.mp3");
        fs::write(&path, audio_bytes()).unwrap();

        let fields = TagFields {
            artist: Some("A".to_string()),
            title: Some("T".to_string()),
            album: Some("Al".to_string()),
            track: Some(3),
        };
        let tagger = Id3Tagger::new();
        tagger.write_tags(&path, &fields).unwrap();

        let tags = tagger.read_tags(&path).unwrap();
        assert_eq!(tags.get("TPE1").map(String::as_str), Some("A"));
        assert_eq!(tags.get("TIT2").map(String::as_str), Some("T"));
        assert_eq!(tags.get("TALB").map(String::as_str), Some("Al"));
        assert_eq!(tags.get("TRCK").map(String::as_str), Some("3"));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn untagged_file_reads_as_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.mp3");
        fs::write(&path, audio_bytes()).unwrap();

        assert!(Id3Tagger::new().read_tags(&path).unwrap().is_empty());
    }

    #[test]
    fn rejects_tiny_or_foreign_files_without_touching_them() {
        let dir = tempfile::tempdir().unwrap();
        let tiny = dir.path().join("tiny.mp3");
        fs::write(&tiny, [0xFF, 0xFB, 0x90]).unwrap();
        let text = dir.path().join("notes.mp3");
        fs::write(&text, vec![b'a'; 4096]).unwrap();

        let tagger = Id3Tagger::new();
        for path in [&tiny, &text] {
            let before = fs::read(path).unwrap();
            let err = tagger
                .write_tags(path, &TagFields { artist: Some("X".into()), ..Default::default() })
                .unwrap_err();
            assert!(matches!(err, crate::error::AppError::Tagging(TaggingError::InvalidMp3 { .. })));
            assert_eq!(fs::read(path).unwrap(), before);
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = Id3Tagger::new()
            .read_tags(Path::new("/no/such/file.mp3"))
            .unwrap_err();
        assert!(matches!(err, crate::error::AppError::Tagging(TaggingError::NotFound { .. })));
    }

    #[test]
    fn backup_then_restore_recovers_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = tagged_mp3(&dir);
        let original = fs::read(&path).unwrap();
        let tagger = Id3Tagger::new();

        let backup = tagger.backup(&path).unwrap();
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("song.mp3.backup."), "{name}");

        fs::write(&path, b"corrupted").unwrap();
        tagger.restore(&backup, &path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), original);
        assert!(!backup.exists());
    }

    #[test]
    fn repeated_backups_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = tagged_mp3(&dir);
        let tagger = Id3Tagger::new();

        let first = tagger.backup(&path).unwrap();
        let second = tagger.backup(&path).unwrap();
        assert_ne!(first, second);

        tagger.discard_backup(&first).unwrap();
        tagger.discard_backup(&second).unwrap();
        assert!(!first.exists() && !second.exists());
        // 已删除的备份再删一次不报错
        tagger.discard_backup(&first).unwrap();
    }
}
