//! 本地磁盘访问
//!
//! 使用 `tokio::fs` 实现 [`ArchiveFs`]，目录和文件句柄即绝对路径。
//! 列表按名称排序，保证不同平台上扫描顺序一致。

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{validate_name, ArchiveFs, DirEntry, EntryKind, FsError};

/// 本地磁盘文件系统
#[derive(Debug, Clone, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

/// 将 IO 错误中的 NotFound 转换为 `FsError::NotFound`
fn map_io(err: std::io::Error, path: &Path) -> FsError {
    if err.kind() == ErrorKind::NotFound {
        FsError::NotFound(path.to_string_lossy().to_string())
    } else {
        FsError::Io(err)
    }
}

#[async_trait]
impl ArchiveFs for LocalFs {
    type Dir = PathBuf;
    type File = PathBuf;

    async fn list_entries(&self, dir: &PathBuf) -> Result<Vec<DirEntry>, FsError> {
        let mut reader = tokio::fs::read_dir(dir).await.map_err(|e| map_io(e, dir))?;
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry().await? {
            let mut file_type = entry.file_type().await?;
            if file_type.is_symlink() {
                // 与 get_directory / get_file 一致，按链接目标判断类型
                match tokio::fs::metadata(entry.path()).await {
                    Ok(metadata) => file_type = metadata.file_type(),
                    Err(e) => {
                        tracing::debug!("[LocalFs] 无法解析符号链接，跳过: {:?} ({})", entry.path(), e);
                        continue;
                    }
                }
            }

            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                continue;
            };

            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                kind,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn get_directory(&self, dir: &PathBuf, name: &str) -> Result<PathBuf, FsError> {
        validate_name(name)?;
        let path = dir.join(name);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| map_io(e, &path))?;

        if !metadata.is_dir() {
            return Err(FsError::NotFound(path.to_string_lossy().to_string()));
        }
        Ok(path)
    }

    async fn get_file(&self, dir: &PathBuf, name: &str) -> Result<PathBuf, FsError> {
        validate_name(name)?;
        let path = dir.join(name);
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| map_io(e, &path))?;

        if !metadata.is_file() {
            return Err(FsError::NotFound(path.to_string_lossy().to_string()));
        }
        Ok(path)
    }

    async fn read_bytes(&self, file: &PathBuf) -> Result<Vec<u8>, FsError> {
        tokio::fs::read(file).await.map_err(|e| map_io(e, file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("inbox/bob_1")).unwrap();
        std::fs::create_dir_all(tmp.path().join("inbox/alice_2")).unwrap();
        std::fs::write(tmp.path().join("inbox/alice_2/message_1.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("inbox/readme.txt"), "hi").unwrap();
        tmp
    }

    #[tokio::test]
    async fn test_list_entries_sorted_with_kinds() {
        let tmp = sample_tree();
        let fs = LocalFs::new();
        let inbox = fs
            .get_directory(&tmp.path().to_path_buf(), "inbox")
            .await
            .unwrap();

        let entries = fs.list_entries(&inbox).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alice_2", "bob_1", "readme.txt"]);
        assert!(entries[0].is_dir());
        assert_eq!(entries[2].kind, EntryKind::File);
    }

    #[tokio::test]
    async fn test_lookup_kind_mismatch_is_not_found() {
        let tmp = sample_tree();
        let fs = LocalFs::new();
        let inbox = tmp.path().join("inbox");

        let err = fs.get_directory(&inbox, "readme.txt").await.unwrap_err();
        assert!(err.is_not_found());
        let err = fs.get_file(&inbox, "bob_1").await.unwrap_err();
        assert!(err.is_not_found());
        let err = fs.get_file(&inbox, "missing.json").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rejects_parent_traversal() {
        let tmp = sample_tree();
        let fs = LocalFs::new();
        let inbox = tmp.path().join("inbox");

        let err = fs.get_directory(&inbox, "..").await.unwrap_err();
        assert!(matches!(err, FsError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_read_text() {
        let tmp = sample_tree();
        let fs = LocalFs::new();
        let convo = tmp.path().join("inbox/alice_2");

        let file = fs.get_file(&convo, "message_1.json").await.unwrap();
        assert_eq!(fs.read_text(&file).await.unwrap(), "{}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_follow_their_target() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("real_inbox/carol_3")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real_inbox"), tmp.path().join("inbox"))
            .unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling")).unwrap();

        let fs = LocalFs::new();
        let root = tmp.path().to_path_buf();
        let entries = fs.list_entries(&root).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["inbox", "real_inbox"]);
        assert!(entries.iter().all(|e| e.is_dir()));

        let inbox = crate::archive::find_inbox_folder(&fs, &root)
            .await
            .unwrap()
            .unwrap();
        let folders = crate::archive::list_conversation_folders(&fs, &inbox)
            .await
            .unwrap();
        assert_eq!(folders[0].name, "carol_3");
    }
}
