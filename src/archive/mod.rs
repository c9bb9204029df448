//! 聊天归档模块
//!
//! 导出的归档结构：
//!
//! ```text
//! <归档根目录>/
//!   ├── autofill_information.json     # 可选，包含归档所有者姓名
//!   └── inbox/
//!       ├── alice_x1y2z3/
//!       │   ├── message_1.json
//!       │   └── photos/...
//!       └── bob_a1b2c3/
//!           └── message_1.json
//! ```
//!
//! ## 模块结构
//!
//! - `types`: 数据类型定义（ConversationSummary, MessageData, Message）
//! - `scanner`: 定位 inbox 目录、列出会话目录
//! - `loader`: 读取并解析 `message_1.json`，填充缓存
//! - `cache`: 会话缓存（目录名 -> 原始 JSON）
//! - `attachments`: 附件路径解析

use thiserror::Error;

use crate::fs_access::FsError;

pub mod attachments;
pub mod cache;
pub mod loader;
pub mod scanner;
pub mod types;

pub use attachments::*;
pub use cache::ConversationCache;
pub use loader::*;
pub use scanner::*;
pub use types::*;

// ============================================================================
// 错误类型
// ============================================================================

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("不是有效的聊天归档目录（缺少 inbox）")]
    NotAnArchive,

    #[error("文件系统错误: {0}")]
    Fs(#[from] FsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("会话未加载: {0}")]
    NotLoaded(String),

    #[error("尚未打开归档")]
    NoArchiveOpen,
}
