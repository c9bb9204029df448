//! 内存目录树
//!
//! 只读的内存文件系统，用 `(路径, 内容)` 构建，列表保持插入顺序。
//! 每次访问都会计数，方便验证扫描和附件解析的访问次数。

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{validate_name, ArchiveFs, DirEntry, EntryKind, FsError};

#[derive(Debug)]
enum Node {
    File(Arc<Vec<u8>>),
    Dir(Arc<MemoryDir>),
}

/// 内存目录句柄
#[derive(Debug, Default)]
pub struct MemoryDir {
    entries: Vec<(String, Node)>,
}

impl MemoryDir {
    fn find(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, node)| node)
    }
}

/// 访问计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessCounts {
    pub listings: usize,
    pub directory_lookups: usize,
    pub file_lookups: usize,
    pub reads: usize,
}

impl AccessCounts {
    pub fn total(&self) -> usize {
        self.listings + self.directory_lookups + self.file_lookups + self.reads
    }
}

#[derive(Debug, Default)]
struct Counters {
    listings: AtomicUsize,
    directory_lookups: AtomicUsize,
    file_lookups: AtomicUsize,
    reads: AtomicUsize,
}

/// 内存文件系统
#[derive(Debug, Clone)]
pub struct MemoryFs {
    root: Arc<MemoryDir>,
    counters: Arc<Counters>,
}

impl MemoryFs {
    pub fn builder() -> MemoryFsBuilder {
        MemoryFsBuilder::default()
    }

    /// 根目录句柄
    pub fn root(&self) -> Arc<MemoryDir> {
        self.root.clone()
    }

    pub fn counts(&self) -> AccessCounts {
        AccessCounts {
            listings: self.counters.listings.load(Ordering::Relaxed),
            directory_lookups: self.counters.directory_lookups.load(Ordering::Relaxed),
            file_lookups: self.counters.file_lookups.load(Ordering::Relaxed),
            reads: self.counters.reads.load(Ordering::Relaxed),
        }
    }

    pub fn reset_counts(&self) {
        self.counters.listings.store(0, Ordering::Relaxed);
        self.counters.directory_lookups.store(0, Ordering::Relaxed);
        self.counters.file_lookups.store(0, Ordering::Relaxed);
        self.counters.reads.store(0, Ordering::Relaxed);
    }
}

#[async_trait]
impl ArchiveFs for MemoryFs {
    type Dir = Arc<MemoryDir>;
    type File = Arc<Vec<u8>>;

    async fn list_entries(&self, dir: &Arc<MemoryDir>) -> Result<Vec<DirEntry>, FsError> {
        self.counters.listings.fetch_add(1, Ordering::Relaxed);

        Ok(dir
            .entries
            .iter()
            .map(|(name, node)| DirEntry {
                name: name.clone(),
                kind: match node {
                    Node::File(_) => EntryKind::File,
                    Node::Dir(_) => EntryKind::Directory,
                },
            })
            .collect())
    }

    async fn get_directory(
        &self,
        dir: &Arc<MemoryDir>,
        name: &str,
    ) -> Result<Arc<MemoryDir>, FsError> {
        self.counters.directory_lookups.fetch_add(1, Ordering::Relaxed);
        validate_name(name)?;

        match dir.find(name) {
            Some(Node::Dir(child)) => Ok(child.clone()),
            _ => Err(FsError::NotFound(name.to_string())),
        }
    }

    async fn get_file(&self, dir: &Arc<MemoryDir>, name: &str) -> Result<Arc<Vec<u8>>, FsError> {
        self.counters.file_lookups.fetch_add(1, Ordering::Relaxed);
        validate_name(name)?;

        match dir.find(name) {
            Some(Node::File(contents)) => Ok(contents.clone()),
            _ => Err(FsError::NotFound(name.to_string())),
        }
    }

    async fn read_bytes(&self, file: &Arc<Vec<u8>>) -> Result<Vec<u8>, FsError> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        Ok(file.as_ref().clone())
    }
}

// ============================================================================
// 构建器
// ============================================================================

#[derive(Debug)]
enum BuildNode {
    File(Vec<u8>),
    Dir(BuildDir),
}

#[derive(Debug, Default)]
struct BuildDir {
    entries: Vec<(String, BuildNode)>,
}

impl BuildDir {
    /// 获取或创建子目录；同名文件会被目录替换
    fn child_dir(&mut self, name: &str) -> &mut BuildDir {
        let idx = match self.entries.iter().position(|(n, _)| n == name) {
            Some(idx) => {
                if !matches!(self.entries[idx].1, BuildNode::Dir(_)) {
                    self.entries[idx].1 = BuildNode::Dir(BuildDir::default());
                }
                idx
            }
            None => {
                self.entries
                    .push((name.to_string(), BuildNode::Dir(BuildDir::default())));
                self.entries.len() - 1
            }
        };

        match &mut self.entries[idx].1 {
            BuildNode::Dir(dir) => dir,
            BuildNode::File(_) => unreachable!("entry was just made a directory"),
        }
    }

    fn put_file(&mut self, name: &str, contents: Vec<u8>) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, node)) => *node = BuildNode::File(contents),
            None => self.entries.push((name.to_string(), BuildNode::File(contents))),
        }
    }

    fn freeze(self) -> MemoryDir {
        MemoryDir {
            entries: self
                .entries
                .into_iter()
                .map(|(name, node)| {
                    let node = match node {
                        BuildNode::File(bytes) => Node::File(Arc::new(bytes)),
                        BuildNode::Dir(dir) => Node::Dir(Arc::new(dir.freeze())),
                    };
                    (name, node)
                })
                .collect(),
        }
    }
}

/// [`MemoryFs`] 构建器，路径以 `/` 分隔
#[derive(Debug, Default)]
pub struct MemoryFsBuilder {
    root: BuildDir,
}

impl MemoryFsBuilder {
    /// 添加文件，自动创建中间目录
    pub fn file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let Some((file_name, parents)) = segments.split_last() {
            let mut dir = &mut self.root;
            for segment in parents {
                dir = dir.child_dir(segment);
            }
            dir.put_file(file_name, contents.into());
        }
        self
    }

    /// 添加（可能为空的）目录
    pub fn dir(mut self, path: &str) -> Self {
        let mut dir = &mut self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            dir = dir.child_dir(segment);
        }
        self
    }

    pub fn build(self) -> MemoryFs {
        MemoryFs {
            root: Arc::new(self.root.freeze()),
            counters: Arc::new(Counters::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listing_keeps_insertion_order() {
        let fs = MemoryFs::builder()
            .dir("zeta")
            .file("alpha.txt", "a")
            .dir("beta")
            .build();

        let entries = fs.list_entries(&fs.root()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha.txt", "beta"]);
        assert!(entries[0].is_dir());
        assert!(!entries[1].is_dir());
    }

    #[tokio::test]
    async fn test_nested_lookup_and_counts() {
        let fs = MemoryFs::builder().file("a/b/c.txt", "hello").build();

        let a = fs.get_directory(&fs.root(), "a").await.unwrap();
        let b = fs.get_directory(&a, "b").await.unwrap();
        let c = fs.get_file(&b, "c.txt").await.unwrap();
        assert_eq!(fs.read_text(&c).await.unwrap(), "hello");

        assert_eq!(
            fs.counts(),
            AccessCounts {
                listings: 0,
                directory_lookups: 2,
                file_lookups: 1,
                reads: 1,
            }
        );

        fs.reset_counts();
        assert_eq!(fs.counts().total(), 0);
    }

    #[tokio::test]
    async fn test_kind_mismatch_is_not_found() {
        let fs = MemoryFs::builder().file("a/b.txt", "x").build();

        assert!(fs.get_file(&fs.root(), "a").await.unwrap_err().is_not_found());
        let a = fs.get_directory(&fs.root(), "a").await.unwrap();
        assert!(fs.get_directory(&a, "b.txt").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_file_overwrite_keeps_position() {
        let fs = MemoryFs::builder()
            .file("one.txt", "1")
            .file("two.txt", "2")
            .file("one.txt", "uno")
            .build();

        let entries = fs.list_entries(&fs.root()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "one.txt");

        let one = fs.get_file(&fs.root(), "one.txt").await.unwrap();
        assert_eq!(fs.read_text(&one).await.unwrap(), "uno");
    }
}
