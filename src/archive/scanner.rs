//! 归档扫描
//!
//! 两个操作都只遍历一层目录，不递归。

use crate::fs_access::ArchiveFs;

use super::ArchiveError;

/// 会话容器目录名（区分大小写）
pub const INBOX_DIR_NAME: &str = "inbox";

/// 一个会话目录
#[derive(Debug, Clone)]
pub struct ConversationFolder<D> {
    /// 目录名，同时是缓存键
    pub name: String,
    pub dir: D,
}

/// 查找归档根目录下名为 `inbox` 的子目录
///
/// 返回 `Ok(None)` 表示不是可识别的归档结构
pub async fn find_inbox_folder<F: ArchiveFs>(
    fs: &F,
    root: &F::Dir,
) -> Result<Option<F::Dir>, ArchiveError> {
    let entries = fs.list_entries(root).await?;

    let Some(inbox) = entries
        .iter()
        .find(|entry| entry.is_dir() && entry.name == INBOX_DIR_NAME)
    else {
        tracing::info!("[Scanner] 未找到 inbox 目录（共 {} 个条目）", entries.len());
        return Ok(None);
    };

    Ok(Some(fs.get_directory(root, &inbox.name).await?))
}

/// 列出 inbox 下的会话目录，忽略非目录条目，保持列表顺序
pub async fn list_conversation_folders<F: ArchiveFs>(
    fs: &F,
    inbox: &F::Dir,
) -> Result<Vec<ConversationFolder<F::Dir>>, ArchiveError> {
    let entries = fs.list_entries(inbox).await?;
    let mut folders = Vec::with_capacity(entries.len());

    for entry in entries.into_iter().filter(|entry| entry.is_dir()) {
        match fs.get_directory(inbox, &entry.name).await {
            Ok(dir) => folders.push(ConversationFolder {
                name: entry.name,
                dir,
            }),
            // 列出后被删除等情况，按缺失处理
            Err(e) if e.is_not_found() => {
                tracing::debug!("[Scanner] 会话目录不可访问，跳过: {} ({})", entry.name, e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::debug!("[Scanner] 发现 {} 个会话目录", folders.len());
    Ok(folders)
}
