//! 消息分组
//!
//! 按时间戳升序（稳定排序）排列后，把同一发送者的连续消息合成一组。
//! 发送者比较使用原始（未解码）名称，解码只用于显示。
//!
//! 另外提供分组的显示模型：每条消息决定以文本、图片、链接、隐藏
//! 还是"不支持"的原始 JSON 形式展示。

use serde::Serialize;

use crate::archive::{strip_media_prefix, Message, MessageKind};
use crate::decoder::{decode_option, decode_string};
use crate::statistics::group_actors_by_reaction;

/// 按连续发送者分组
///
/// 空输入返回空列表
pub fn group_by_sender(mut messages: Vec<Message>) -> Vec<Vec<Message>> {
    messages.sort_by_key(|m| m.timestamp_ms);

    let mut groups: Vec<Vec<Message>> = Vec::new();
    for message in messages {
        match groups.last_mut() {
            Some(group)
                if group
                    .last()
                    .is_some_and(|last| last.sender_name == message.sender_name) =>
            {
                group.push(message)
            }
            _ => groups.push(vec![message]),
        }
    }

    groups
}

// ============================================================================
// 显示模型
// ============================================================================

/// 消息的展示形式
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MessageBody {
    Text {
        text: String,
    },
    /// 图片路径已去掉 `messages/` 前缀，可直接交给附件解析
    Photos {
        uris: Vec<String>,
        caption: Option<String>,
    },
    Link {
        url: String,
        text: String,
    },
    /// 没有内容的 Generic 消息不显示
    Hidden,
    /// 未支持的类型，显示原始 JSON
    #[serde(rename_all = "camelCase")]
    Unsupported {
        raw_json: String,
    },
}

/// 一种表情及其回应者（均已解码）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionView {
    pub reaction: String,
    pub actors: Vec<String>,
}

/// 单条消息的显示模型
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub timestamp_ms: i64,
    pub is_first: bool,
    pub is_last: bool,
    pub is_unsent: bool,
    pub body: MessageBody,
    pub reactions: Vec<ReactionView>,
}

/// 一组连续消息的显示模型
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageGroupView {
    /// 已解码的发送者名称
    pub sender_name: String,
    /// 发送者是否为归档所有者
    pub is_me: bool,
    pub messages: Vec<MessageView>,
}

/// 决定消息的展示形式
pub fn message_body(message: &Message) -> MessageBody {
    let content = decode_option(message.content.as_deref());

    match &message.kind {
        MessageKind::Generic { photos, .. } if !photos.is_empty() => MessageBody::Photos {
            uris: photos
                .iter()
                .map(|photo| strip_media_prefix(&photo.uri).to_string())
                .collect(),
            caption: content,
        },
        MessageKind::Generic { .. } => match content {
            Some(text) if !text.is_empty() => MessageBody::Text { text },
            _ => MessageBody::Hidden,
        },
        MessageKind::Share {
            share: Some(share),
        } if share.link.as_deref().is_some_and(|link| !link.is_empty()) => {
            MessageBody::Link {
                url: share.link.clone().unwrap_or_default(),
                text: content.unwrap_or_default(),
            }
        }
        MessageKind::Share { .. } => MessageBody::Text {
            text: content.unwrap_or_default(),
        },
        MessageKind::Subscribe { .. }
        | MessageKind::Unsubscribe { .. }
        | MessageKind::Call { .. }
        | MessageKind::Unrecognized { .. } => MessageBody::Unsupported {
            raw_json: message.raw().to_string(),
        },
    }
}

fn reaction_views(message: &Message) -> Vec<ReactionView> {
    group_actors_by_reaction(&message.reactions)
        .into_iter()
        .map(|(reaction, actors)| ReactionView {
            reaction: decode_string(&reaction),
            actors: actors.iter().map(|actor| decode_string(actor)).collect(),
        })
        .collect()
}

/// 构建分组显示模型
///
/// `owner_name` 为已解码的归档所有者姓名，用于判断 `is_me`
pub fn build_group_views(groups: &[Vec<Message>], owner_name: Option<&str>) -> Vec<MessageGroupView> {
    groups
        .iter()
        .filter_map(|group| {
            let first = group.first()?;
            let sender_name = decode_string(&first.sender_name);
            let is_me = owner_name.is_some_and(|owner| owner == sender_name);
            let last_idx = group.len() - 1;

            let messages = group
                .iter()
                .enumerate()
                .map(|(i, message)| MessageView {
                    timestamp_ms: message.timestamp_ms,
                    is_first: i == 0,
                    is_last: i == last_idx,
                    is_unsent: message.is_unsent,
                    body: message_body(message),
                    reactions: reaction_views(message),
                })
                .collect();

            Some(MessageGroupView {
                sender_name,
                is_me,
                messages,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(sender: &str, ts: i64) -> Message {
        serde_json::from_value(json!({
            "sender_name": sender,
            "timestamp_ms": ts,
            "content": format!("{sender}@{ts}"),
            "type": "Generic",
            "is_unsent": false
        }))
        .unwrap()
    }

    fn shape(groups: &[Vec<Message>]) -> Vec<Vec<(String, i64)>> {
        groups
            .iter()
            .map(|g| g.iter().map(|m| (m.sender_name.clone(), m.timestamp_ms)).collect())
            .collect()
    }

    #[test]
    fn test_empty_and_single() {
        assert!(group_by_sender(Vec::new()).is_empty());

        let groups = group_by_sender(vec![msg("Alice", 1)]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 1);
    }

    #[test]
    fn test_sorts_before_grouping() {
        let groups = group_by_sender(vec![msg("Alice", 100), msg("Bob", 50)]);
        assert_eq!(
            shape(&groups),
            vec![
                vec![("Bob".to_string(), 50)],
                vec![("Alice".to_string(), 100)]
            ]
        );
    }

    #[test]
    fn test_runs_and_stable_ties() {
        let mut bob_first = msg("Bob", 2);
        bob_first.content = Some("first".into());
        let input = vec![
            msg("Alice", 3),
            msg("Alice", 1),
            bob_first,
            msg("Bob", 2),
            msg("Alice", 4),
        ];

        let groups = group_by_sender(input);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 2);
        assert_eq!(groups[1][0].content.as_deref(), Some("first"));
        assert_eq!(groups[2].len(), 2);

        // 相邻分组发送者不同
        for pair in groups.windows(2) {
            assert_ne!(pair[0][0].sender_name, pair[1][0].sender_name);
        }
    }

    #[test]
    fn test_sorted_single_sender_is_one_group_in_order() {
        let input: Vec<_> = (0..5).map(|ts| msg("Alice", ts)).collect();
        let groups = group_by_sender(input.clone());
        assert_eq!(groups, vec![input]);
    }

    #[test]
    fn test_compares_raw_sender_names() {
        // 两个不同的原始值解码后相同（非法字节都变成 U+FFFD），仍然分成两组
        let groups = group_by_sender(vec![msg("x\u{00ff}", 1), msg("x\u{00fe}", 2)]);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_message_body_rules() {
        let photo: Message = serde_json::from_value(json!({
            "sender_name": "A", "timestamp_ms": 1, "type": "Generic", "is_unsent": false,
            "photos": [{"uri": "messages/inbox/a/photos/1.jpg", "creation_timestamp": 1}]
        }))
        .unwrap();
        assert_eq!(
            message_body(&photo),
            MessageBody::Photos {
                uris: vec!["inbox/a/photos/1.jpg".into()],
                caption: None
            }
        );

        let empty: Message = serde_json::from_value(json!({
            "sender_name": "A", "timestamp_ms": 1, "type": "Generic", "is_unsent": true
        }))
        .unwrap();
        assert_eq!(message_body(&empty), MessageBody::Hidden);

        let link: Message = serde_json::from_value(json!({
            "sender_name": "A", "timestamp_ms": 1, "type": "Share", "content": "caf\u{00c3}\u{00a9}",
            "share": {"link": "https://example.com"}
        }))
        .unwrap();
        assert_eq!(
            message_body(&link),
            MessageBody::Link {
                url: "https://example.com".into(),
                text: "café".into()
            }
        );

        let share_without_link: Message = serde_json::from_value(json!({
            "sender_name": "A", "timestamp_ms": 1, "type": "Share", "content": "shared"
        }))
        .unwrap();
        assert_eq!(
            message_body(&share_without_link),
            MessageBody::Text {
                text: "shared".into()
            }
        );

        let call: Message = serde_json::from_value(json!({
            "sender_name": "A", "timestamp_ms": 1, "type": "Call", "call_duration": 3
        }))
        .unwrap();
        match message_body(&call) {
            MessageBody::Unsupported { raw_json } => assert!(raw_json.contains("\"call_duration\":3")),
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_shows_archived_json() {
        let raw = json!({
            "sender_name": "A", "timestamp_ms": 1, "content": "A added B",
            "users": [{"name": "B"}], "type": "Subscribe", "extra_field": 42
        });
        let message = Message::from_value(raw.clone()).unwrap();

        match message_body(&message) {
            MessageBody::Unsupported { raw_json } => {
                let shown: serde_json::Value = serde_json::from_str(&raw_json).unwrap();
                assert_eq!(shown, raw);
                assert!(shown.get("is_unsent").is_none());
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn test_group_views_mark_owner_and_positions() {
        let mut reacted = msg("Bob", 2);
        reacted.reactions = vec![
            crate::archive::Reaction {
                reaction: "\u{00f0}\u{009f}\u{0098}\u{0086}".into(),
                actor: "Alice".into(),
            },
            crate::archive::Reaction {
                reaction: "\u{00f0}\u{009f}\u{0098}\u{0086}".into(),
                actor: "Alice".into(),
            },
        ];

        let groups = group_by_sender(vec![msg("Alice", 1), reacted, msg("Bob", 3)]);
        let views = build_group_views(&groups, Some("Alice"));

        assert_eq!(views.len(), 2);
        assert!(views[0].is_me);
        assert!(!views[1].is_me);
        assert!(views[1].messages[0].is_first);
        assert!(!views[1].messages[0].is_last);
        assert!(views[1].messages[1].is_last);
        assert_eq!(
            views[1].messages[0].reactions,
            vec![ReactionView {
                reaction: "😆".into(),
                actors: vec!["Alice".into()]
            }]
        );

        let anonymous = build_group_views(&groups, None);
        assert!(anonymous.iter().all(|g| !g.is_me));
    }

    mod proptest_grouping {
        use super::*;
        use proptest::prelude::*;

        /// 内容带序号，保证每条消息可区分
        fn messages(specs: &[(u8, i64)]) -> Vec<Message> {
            specs
                .iter()
                .enumerate()
                .map(|(i, (sender, ts))| {
                    Message::from_value(json!({
                        "sender_name": format!("S{sender}"),
                        "timestamp_ms": ts,
                        "content": i.to_string(),
                        "type": "Generic"
                    }))
                    .unwrap()
                })
                .collect()
        }

        proptest! {
            #[test]
            fn prop_groups_are_sorted_sender_runs(
                specs in prop::collection::vec((0u8..3, 0i64..20), 1..40)
            ) {
                let input = messages(&specs);
                let groups = group_by_sender(input.clone());

                let mut expected = input;
                expected.sort_by_key(|m| m.timestamp_ms);
                let flattened: Vec<Message> = groups.iter().flatten().cloned().collect();
                prop_assert_eq!(flattened, expected);

                for group in &groups {
                    prop_assert!(!group.is_empty());
                    prop_assert!(group.iter().all(|m| m.sender_name == group[0].sender_name));
                }
                for pair in groups.windows(2) {
                    prop_assert_ne!(&pair[0][0].sender_name, &pair[1][0].sender_name);
                }
            }

            #[test]
            fn prop_single_sender_sorted_is_one_group(len in 1usize..30) {
                let specs: Vec<(u8, i64)> = (0..len as i64).map(|ts| (0, ts)).collect();
                let input = messages(&specs);
                prop_assert_eq!(group_by_sender(input.clone()), vec![input]);
            }
        }
    }
}
