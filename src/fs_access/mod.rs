//! 文件系统访问能力
//!
//! 归档核心不直接调用具体的文件 API，而是通过注入的 [`ArchiveFs`] 访问
//! 层级文件系统：列出目录、按名称获取子目录/文件、读取文件内容。
//!
//! ## 模块结构
//!
//! - `local`: 基于 `tokio::fs` 的本地磁盘实现
//! - `memory`: 内存中的只读目录树（带调用计数，用于测试和演示）

use async_trait::async_trait;
use thiserror::Error;

pub mod local;
pub mod memory;

pub use local::LocalFs;
pub use memory::{AccessCounts, MemoryFs};

// ============================================================================
// 错误类型
// ============================================================================

#[derive(Error, Debug)]
pub enum FsError {
    #[error("条目不存在: {0}")]
    NotFound(String),

    #[error("无效的条目名称: {0:?}")]
    InvalidName(String),

    #[error("文件内容不是有效的 UTF-8: {0}")]
    InvalidUtf8(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// 是否为"不存在"类错误（包括非法名称，调用方统一按缺失处理）
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_) | FsError::InvalidName(_))
    }
}

// ============================================================================
// 目录条目
// ============================================================================

/// 目录条目类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// 目录中的一个条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

// ============================================================================
// 访问能力
// ============================================================================

/// 层级文件系统访问能力
///
/// `Dir` / `File` 是不透明句柄，核心只持有、从不解析它们。
#[async_trait]
pub trait ArchiveFs: Send + Sync {
    type Dir: Clone + Send + Sync;
    type File: Send + Sync;

    /// 列出目录下的直接条目
    async fn list_entries(&self, dir: &Self::Dir) -> Result<Vec<DirEntry>, FsError>;

    /// 按名称获取子目录，不存在时返回 `FsError::NotFound`
    async fn get_directory(&self, dir: &Self::Dir, name: &str) -> Result<Self::Dir, FsError>;

    /// 按名称获取文件，不存在时返回 `FsError::NotFound`
    async fn get_file(&self, dir: &Self::Dir, name: &str) -> Result<Self::File, FsError>;

    async fn read_bytes(&self, file: &Self::File) -> Result<Vec<u8>, FsError>;

    /// 以 UTF-8 读取文件
    async fn read_text(&self, file: &Self::File) -> Result<String, FsError> {
        let bytes = self.read_bytes(file).await?;
        String::from_utf8(bytes).map_err(|e| FsError::InvalidUtf8(e.to_string()))
    }
}

/// 校验单个路径段名称，拒绝可能逃逸出归档根目录的名称
pub(crate) fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}
