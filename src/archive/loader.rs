//! 会话加载
//!
//! - `load_summaries`: 并发读取每个会话目录的 `message_1.json`，生成摘要并写入缓存
//! - `load_detail`: 从缓存解析完整会话（不会重新读取磁盘）
//! - `load_owner_name`: 读取归档所有者姓名
//! - `sort_summaries` / `filter_summaries`: 会话列表排序与搜索
//!
//! ## 摘要时间戳
//!
//! `last_sent_at_ms` 取会话中**最早**一条消息的时间戳。归档按新到旧存储消息，
//! 最后一条即最早一条；这里直接取最小值，不依赖存储顺序。
//!
//! ## 错误处理
//!
//! 缺少 `message_1.json` 的目录直接排除；JSON 格式错误的会话记录警告后跳过，
//! 不影响其他会话。

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Reverse;

use crate::decoder::decode_string;
use crate::fs_access::ArchiveFs;

use super::cache::ConversationCache;
use super::scanner::{list_conversation_folders, ConversationFolder};
use super::types::{ConversationSummary, MessageData, Participant};
use super::ArchiveError;

/// 会话消息文件名
pub const MESSAGE_FILE_NAME: &str = "message_1.json";

/// 归档所有者信息文件名
pub const AUTOFILL_FILE_NAME: &str = "autofill_information.json";

/// 所有者姓名在 autofill 文件中的路径
const OWNER_NAME_POINTER: &str = "/autofill_information_v2/FULL_NAME/0";

/// 默认同时读取的会话数
pub const DEFAULT_MAX_CONCURRENT_READS: usize = 16;

/// 摘要只需要的字段
#[derive(Deserialize)]
struct SummaryProbe {
    participants: Vec<Participant>,
    title: String,
    messages: Vec<TimestampProbe>,
}

#[derive(Deserialize)]
struct TimestampProbe {
    timestamp_ms: i64,
}

// ============================================================================
// 摘要扫描
// ============================================================================

/// 读取会话目录中的消息文件，文件不存在时返回 `None`
pub async fn read_message_json<F: ArchiveFs>(
    fs: &F,
    folder: &F::Dir,
) -> Result<Option<String>, ArchiveError> {
    let file = match fs.get_file(folder, MESSAGE_FILE_NAME).await {
        Ok(file) => file,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    Ok(Some(fs.read_text(&file).await?))
}

/// 由会话 JSON 构建摘要
pub fn summary_from_json(
    directory_name: &str,
    json: &str,
) -> Result<ConversationSummary, serde_json::Error> {
    let probe: SummaryProbe = serde_json::from_str(json)?;
    let title = decode_string(&probe.title);

    let participant_name = match probe.participants.first() {
        Some(first) => decode_string(&first.name),
        None => title.clone(),
    };

    let last_sent_at_ms = probe
        .messages
        .iter()
        .map(|m| m.timestamp_ms)
        .min()
        .unwrap_or(0);

    Ok(ConversationSummary {
        participant_name,
        directory_name: directory_name.to_string(),
        last_sent_at_ms,
        title,
    })
}

/// 加载单个会话的摘要；任何失败都只排除该会话
async fn load_one_summary<F: ArchiveFs>(
    fs: &F,
    folder: &ConversationFolder<F::Dir>,
    cache: &ConversationCache,
    generation: u64,
) -> Option<ConversationSummary> {
    let json = match read_message_json(fs, &folder.dir).await {
        Ok(Some(json)) => json,
        Ok(None) => {
            tracing::debug!("[Loader] 目录中没有 {}，跳过: {}", MESSAGE_FILE_NAME, folder.name);
            return None;
        }
        Err(e) => {
            tracing::warn!("[Loader] 读取会话失败，跳过: {} ({})", folder.name, e);
            return None;
        }
    };

    let summary = summary_from_json(&folder.name, &json);
    cache.set_for_generation(generation, &folder.name, json);

    match summary {
        Ok(summary) => Some(summary),
        Err(e) => {
            tracing::warn!("[Loader] 会话 JSON 解析失败，跳过: {} ({})", folder.name, e);
            None
        }
    }
}

/// 扫描 inbox 下所有会话，返回摘要列表
///
/// 结果顺序与目录列表顺序一致（与读取完成顺序无关）。
/// 原始 JSON 按目录名写入 `cache`，之后的详情加载直接命中缓存。
pub async fn load_summaries<F: ArchiveFs>(
    fs: &F,
    inbox: &F::Dir,
    cache: &ConversationCache,
    max_concurrent_reads: usize,
) -> Result<Vec<ConversationSummary>, ArchiveError> {
    let generation = cache.generation();
    let folders = list_conversation_folders(fs, inbox).await?;
    let total = folders.len();

    let summaries: Vec<ConversationSummary> = stream::iter(folders.iter())
        .map(|folder| load_one_summary(fs, folder, cache, generation))
        .buffered(max_concurrent_reads.max(1))
        .filter_map(|summary| async move { summary })
        .collect()
        .await;

    tracing::info!(
        "[Loader] 扫描完成: {} 个目录，{} 个会话",
        total,
        summaries.len()
    );

    Ok(summaries)
}

// ============================================================================
// 详情与所有者
// ============================================================================

/// 从缓存加载完整会话
///
/// 未缓存时返回 `Ok(None)`，不会读取磁盘
pub fn load_detail(
    cache: &ConversationCache,
    directory_name: &str,
) -> Result<Option<MessageData>, ArchiveError> {
    let Some(json) = cache.get(directory_name) else {
        return Ok(None);
    };

    let data: MessageData = serde_json::from_str(&json)?;
    Ok(Some(data))
}

/// 读取归档所有者姓名（已解码）
///
/// 文件缺失或结构不符时返回 `None`
pub async fn load_owner_name<F: ArchiveFs>(fs: &F, root: &F::Dir) -> Option<String> {
    let file = fs
        .get_file(root, AUTOFILL_FILE_NAME)
        .await
        .map_err(|e| tracing::debug!("[Loader] 没有所有者信息文件: {}", e))
        .ok()?;

    let text = fs
        .read_text(&file)
        .await
        .map_err(|e| tracing::debug!("[Loader] 读取所有者信息失败: {}", e))
        .ok()?;

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| tracing::debug!("[Loader] 所有者信息解析失败: {}", e))
        .ok()?;

    let raw = value.pointer(OWNER_NAME_POINTER)?.as_str()?;
    Some(decode_string(raw))
}

// ============================================================================
// 列表排序与搜索
// ============================================================================

/// 按 `last_sent_at_ms` 降序排序（稳定排序，相等时保持原顺序）
pub fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by_key(|s| Reverse(s.last_sent_at_ms));
}

/// 按标题或目录名做字面子串过滤，空查询保留全部
pub fn filter_summaries(summaries: &[ConversationSummary], query: &str) -> Vec<ConversationSummary> {
    summaries
        .iter()
        .filter(|s| s.title.contains(query) || s.directory_name.contains(query))
        .cloned()
        .collect()
}
