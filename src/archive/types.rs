//! 归档数据类型定义
//!
//! - `ConversationSummary`: 会话列表中的摘要（扫描时构建）
//! - `MessageData`: 完整解析后的会话内容（选中时加载）
//! - `Message` / `MessageKind`: 按 `type` 字段区分的消息
//!
//! 所有文本字段都是归档中的原始（未解码）值，显示前需经过
//! [`crate::decoder::decode_string`]。

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 会话摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// 第一个参与者名称（已解码），作为备用显示名
    pub participant_name: String,
    /// 会话目录名，同一归档内唯一，用作缓存键
    pub directory_name: String,
    /// 最早一条消息的时间戳（毫秒），用于列表排序
    pub last_sent_at_ms: i64,
    /// 会话标题（已解码）
    pub title: String,
}

/// 会话参与者
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
}

/// 消息表情回应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub reaction: String,
    pub actor: String,
}

/// 媒体引用（图片、视频、文件等）
///
/// `uri` 相对于归档根目录，带有固定的 `messages/` 前缀
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
}

/// 分享内容
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShareInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_text: Option<String>,
}

// ============================================================================
// 消息
// ============================================================================

/// 消息类型相关的内容
#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    Generic {
        photos: Vec<MediaRef>,
        videos: Vec<MediaRef>,
        gifs: Vec<MediaRef>,
        audio_files: Vec<MediaRef>,
        files: Vec<MediaRef>,
        sticker: Option<MediaRef>,
    },
    Subscribe {
        users: Vec<Participant>,
    },
    Unsubscribe {
        users: Vec<Participant>,
    },
    Call {
        /// 通话时长（秒）
        call_duration: i64,
        missed: bool,
    },
    Share {
        share: Option<ShareInfo>,
    },
    /// 未建模的类型，保留原始 JSON
    Unrecognized {
        type_name: Option<String>,
        raw: Value,
    },
}

/// 一条消息
///
/// 类型化字段用于分组和显示，`raw` 保留归档中的原始 JSON，
/// 序列化和"不支持"的诊断显示都使用它。
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub sender_name: String,
    pub timestamp_ms: i64,
    pub content: Option<String>,
    pub is_unsent: bool,
    pub reactions: Vec<Reaction>,
    pub kind: MessageKind,
    raw: Value,
}

#[derive(Deserialize)]
struct CommonFields {
    sender_name: String,
    timestamp_ms: i64,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    is_unsent: bool,
    #[serde(default)]
    reactions: Vec<Reaction>,
    #[serde(rename = "type", default)]
    type_name: Option<String>,
}

#[derive(Deserialize)]
struct GenericPayload {
    #[serde(default)]
    photos: Vec<MediaRef>,
    #[serde(default)]
    videos: Vec<MediaRef>,
    #[serde(default)]
    gifs: Vec<MediaRef>,
    #[serde(default)]
    audio_files: Vec<MediaRef>,
    #[serde(default)]
    files: Vec<MediaRef>,
    #[serde(default)]
    sticker: Option<MediaRef>,
}

#[derive(Deserialize)]
struct UsersPayload {
    #[serde(default)]
    users: Vec<Participant>,
}

#[derive(Deserialize)]
struct CallPayload {
    #[serde(default)]
    call_duration: i64,
    #[serde(default)]
    missed: bool,
}

#[derive(Deserialize)]
struct SharePayload {
    #[serde(default)]
    share: Option<ShareInfo>,
}

impl MessageKind {
    /// 按 `type` 解析类型相关字段，无法识别或结构不符时保留原始 JSON
    fn parse(type_name: Option<String>, value: &Value) -> MessageKind {
        let parsed = match type_name.as_deref() {
            Some("Generic") => GenericPayload::deserialize(value).ok().map(|p| {
                MessageKind::Generic {
                    photos: p.photos,
                    videos: p.videos,
                    gifs: p.gifs,
                    audio_files: p.audio_files,
                    files: p.files,
                    sticker: p.sticker,
                }
            }),
            Some("Subscribe") => UsersPayload::deserialize(value)
                .ok()
                .map(|p| MessageKind::Subscribe { users: p.users }),
            Some("Unsubscribe") => UsersPayload::deserialize(value)
                .ok()
                .map(|p| MessageKind::Unsubscribe { users: p.users }),
            Some("Call") => CallPayload::deserialize(value).ok().map(|p| MessageKind::Call {
                call_duration: p.call_duration,
                missed: p.missed,
            }),
            Some("Share") => SharePayload::deserialize(value)
                .ok()
                .map(|p| MessageKind::Share { share: p.share }),
            _ => None,
        };

        parsed.unwrap_or_else(|| MessageKind::Unrecognized {
            type_name,
            raw: value.clone(),
        })
    }

    /// 归档中的 `type` 值
    pub fn type_name(&self) -> Option<&str> {
        match self {
            MessageKind::Generic { .. } => Some("Generic"),
            MessageKind::Subscribe { .. } => Some("Subscribe"),
            MessageKind::Unsubscribe { .. } => Some("Unsubscribe"),
            MessageKind::Call { .. } => Some("Call"),
            MessageKind::Share { .. } => Some("Share"),
            MessageKind::Unrecognized { type_name, .. } => type_name.as_deref(),
        }
    }
}

impl Message {
    /// 从单条消息的 JSON 构建
    ///
    /// 只有缺少 `sender_name` / `timestamp_ms` 时才会失败
    pub fn from_value(value: Value) -> Result<Message, serde_json::Error> {
        let common = CommonFields::deserialize(&value)?;
        let kind = MessageKind::parse(common.type_name, &value);

        Ok(Message {
            sender_name: common.sender_name,
            timestamp_ms: common.timestamp_ms,
            content: common.content,
            is_unsent: common.is_unsent,
            reactions: common.reactions,
            kind,
            raw: value,
        })
    }

    /// 归档中的原始 JSON（不随类型化字段的修改而变化）
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// 图片引用（非 Generic 消息为空）
    pub fn photos(&self) -> &[MediaRef] {
        match &self.kind {
            MessageKind::Generic { photos, .. } => photos,
            _ => &[],
        }
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Message::from_value(value).map_err(de::Error::custom)
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

// ============================================================================
// 会话内容
// ============================================================================

/// 完整的会话内容（`message_1.json`）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    pub participants: Vec<Participant>,
    pub messages: Vec<Message>,
    pub title: String,
    #[serde(default)]
    pub is_still_participant: bool,
    #[serde(default)]
    pub thread_type: Option<String>,
    #[serde(default)]
    pub thread_path: Option<String>,
    /// 未建模的顶层字段，原样保留
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
