//! 附件路径解析
//!
//! 消息中的媒体 `uri` 形如 `messages/inbox/<会话>/photos/<文件>`，
//! 相对的是归档的上一级目录。去掉固定的 `messages/` 前缀后，
//! 逐段在归档根目录下查找：前面的段是目录，最后一段是文件。
//!
//! 任何一段缺失都返回 `None`，由调用方显示为"无附件"。

use crate::fs_access::ArchiveFs;

/// 媒体路径的固定前缀
pub const MEDIA_PREFIX: &str = "messages/";

/// 已读取的附件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAttachment {
    /// 相对归档根目录的路径
    pub path: String,
    /// 根据扩展名推断的 MIME 类型
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 去掉 `messages/` 前缀（如果有）
pub fn strip_media_prefix(uri: &str) -> &str {
    uri.strip_prefix(MEDIA_PREFIX).unwrap_or(uri)
}

/// 按 `/` 分段解析相对路径
///
/// 空路径或含空段（`a//b`、末尾 `/`）时不访问文件系统，直接返回 `None`
pub async fn resolve_path<F: ArchiveFs>(
    fs: &F,
    root: &F::Dir,
    relative_path: &str,
) -> Option<F::File> {
    if relative_path.is_empty() {
        return None;
    }

    let segments: Vec<&str> = relative_path.split('/').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    let (file_name, parents) = segments.split_last()?;

    let mut current = root.clone();
    for segment in parents {
        match fs.get_directory(&current, segment).await {
            Ok(dir) => current = dir,
            Err(e) => {
                tracing::debug!("[Attachment] 路径段不存在: {} ({})", relative_path, e);
                return None;
            }
        }
    }

    match fs.get_file(&current, file_name).await {
        Ok(file) => Some(file),
        Err(e) => {
            tracing::debug!("[Attachment] 文件不存在: {} ({})", relative_path, e);
            None
        }
    }
}

/// 解析消息中的媒体 `uri`
pub async fn resolve_media<F: ArchiveFs>(fs: &F, root: &F::Dir, uri: &str) -> Option<F::File> {
    resolve_path(fs, root, strip_media_prefix(uri)).await
}

/// 解析并读取附件内容
pub async fn load_attachment<F: ArchiveFs>(
    fs: &F,
    root: &F::Dir,
    uri: &str,
) -> Option<ResolvedAttachment> {
    let path = strip_media_prefix(uri);
    let file = resolve_path(fs, root, path).await?;

    let bytes = match fs.read_bytes(&file).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("[Attachment] 读取附件失败: {} ({})", path, e);
            return None;
        }
    };

    let content_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();

    Some(ResolvedAttachment {
        path: path.to_string(),
        content_type,
        bytes,
    })
}
