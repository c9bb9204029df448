//! 会话统计
//!
//! - `count_by_sender`: 每个发送者的消息数（键为原始名称）
//! - `creation_time`: 最早一条消息的时间戳
//! - `group_actors_by_reaction`: 按表情汇总回应者（同一表情内去重）
//! - `chat_statistics`: 会话信息面板所需的全部统计

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::archive::{Message, MessageData, Reaction};
use crate::decoder::decode_string;

/// 按发送者计数
pub fn count_by_sender(messages: &[Message]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for message in messages {
        *counts.entry(message.sender_name.clone()).or_insert(0) += 1;
    }
    counts
}

/// 会话创建时间（最早的消息时间戳），空会话返回 `None`
pub fn creation_time(messages: &[Message]) -> Option<i64> {
    messages.iter().map(|m| m.timestamp_ms).min()
}

/// 按表情汇总回应者
///
/// 同一表情下同一回应者只记一次，不同表情之间不去重；保持首次出现的顺序
pub fn group_actors_by_reaction(reactions: &[Reaction]) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for Reaction { reaction, actor } in reactions {
        let actors = grouped.entry(reaction.clone()).or_default();
        if !actors.contains(actor) {
            actors.push(actor.clone());
        }
    }
    grouped
}

// ============================================================================
// 会话信息面板
// ============================================================================

/// 单个发送者的消息占比
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderShare {
    /// 已解码的发送者名称
    pub sender_name: String,
    pub count: usize,
    /// 百分比，保留一位小数
    pub percent: f64,
}

/// 会话统计
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStatistics {
    pub message_count: usize,
    pub member_count: usize,
    pub created_at_ms: i64,
    /// 按消息数降序
    pub sender_counts: Vec<SenderShare>,
}

/// 计算会话统计，空会话返回 `None`
pub fn chat_statistics(data: &MessageData) -> Option<ChatStatistics> {
    let created_at_ms = creation_time(&data.messages)?;
    let total = data.messages.len();

    let mut sender_counts: Vec<SenderShare> = count_by_sender(&data.messages)
        .into_iter()
        .map(|(sender_name, count)| SenderShare {
            sender_name: decode_string(&sender_name),
            count,
            percent: (count as f64 * 1000.0 / total as f64).round() / 10.0,
        })
        .collect();

    sender_counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.sender_name.cmp(&b.sender_name))
    });

    Some(ChatStatistics {
        message_count: total,
        member_count: data.participants.len(),
        created_at_ms,
        sender_counts,
    })
}
