//! 聊天归档浏览核心
//!
//! 读取本地导出的聊天归档（`inbox/<会话>/message_1.json`），
//! 提供会话列表、消息分组、会话统计和附件解析。
//! 文件系统访问通过 [`ArchiveFs`] 注入，便于在测试中替换为内存实现。
//!
//! ## 功能模块
//! - `decoder`: 修复导出文件中按 Latin-1 转义的 UTF-8 文本
//! - `fs_access`: 文件系统访问抽象（本地目录 / 内存）
//! - `archive`: 归档扫描、会话加载、会话缓存、附件解析
//! - `grouping`: 按连续发送者分组及显示模型
//! - `statistics`: 消息计数、创建时间、回应汇总
//! - `session`: 归档会话控制（打开、重新开始、浏览）
//! - `config`: 本地配置（最近归档、并发数、所有者姓名）
//!
//! ## 更新日志
//! - 2026-10-17: 初始版本

pub mod archive;
pub mod config;
pub mod decoder;
pub mod fs_access;
pub mod grouping;
pub mod session;
pub mod statistics;

pub use archive::{
    ArchiveError, ConversationCache, ConversationSummary, Message, MessageData, MessageKind,
    ResolvedAttachment,
};
pub use config::{ConfigError, ConfigManager, ViewerConfig};
pub use decoder::decode_string;
pub use fs_access::{ArchiveFs, FsError, LocalFs, MemoryFs};
pub use grouping::{group_by_sender, MessageGroupView};
pub use session::ArchiveSession;
pub use statistics::{chat_statistics, ChatStatistics};
