//! 归档会话控制
//!
//! `ArchiveSession` 持有文件系统访问能力、会话缓存和当前打开的归档。
//! 缓存随会话创建，打开新归档或"重新开始"时清空，不使用全局单例，
//! 多个会话（或多个测试）之间互不影响。
//!
//! ## 使用方式
//!
//! ```no_run
//! # async fn demo() -> Result<(), chat_archive_viewer_lib::archive::ArchiveError> {
//! use chat_archive_viewer_lib::{ArchiveSession, LocalFs};
//!
//! let mut session = ArchiveSession::new(LocalFs::new());
//! session.open_archive("/path/to/messages".into()).await?;
//! for chat in session.chats("") {
//!     println!("{} ({})", chat.title, chat.directory_name);
//! }
//! # Ok(())
//! # }
//! ```

use crate::archive::{
    find_inbox_folder, filter_summaries, load_attachment, load_detail, load_owner_name,
    load_summaries, sort_summaries, ArchiveError, ConversationCache, ConversationSummary, Message,
    MessageData, ResolvedAttachment, DEFAULT_MAX_CONCURRENT_READS,
};
use crate::config::ViewerConfig;
use crate::fs_access::ArchiveFs;
use crate::grouping::{build_group_views, group_by_sender, MessageGroupView};
use crate::statistics::{chat_statistics, ChatStatistics};

/// 当前打开的归档
#[derive(Debug, Clone)]
pub struct OpenArchive<D> {
    pub root: D,
    pub inbox: D,
    /// 目录列表顺序
    pub summaries: Vec<ConversationSummary>,
    /// 已解码的所有者姓名
    pub owner_name: Option<String>,
}

/// 归档浏览会话
pub struct ArchiveSession<F: ArchiveFs> {
    fs: F,
    cache: ConversationCache,
    max_concurrent_reads: usize,
    owner_name_override: Option<String>,
    current: Option<OpenArchive<F::Dir>>,
}

impl<F: ArchiveFs> ArchiveSession<F> {
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            cache: ConversationCache::new(),
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            owner_name_override: None,
            current: None,
        }
    }

    /// 按配置创建会话
    pub fn with_config(fs: F, config: &ViewerConfig) -> Self {
        let mut session = Self::new(fs);
        session.max_concurrent_reads = config.concurrency();
        session.owner_name_override = config.owner_name_override.clone();
        session
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn cache(&self) -> &ConversationCache {
        &self.cache
    }

    pub fn current(&self) -> Option<&OpenArchive<F::Dir>> {
        self.current.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// 打开归档：清空缓存、定位 inbox、扫描所有会话
    ///
    /// 返回可用会话数；没有 inbox 时返回 `ArchiveError::NotAnArchive`
    pub async fn open_archive(&mut self, root: F::Dir) -> Result<usize, ArchiveError> {
        self.start_over();

        let inbox = find_inbox_folder(&self.fs, &root)
            .await?
            .ok_or(ArchiveError::NotAnArchive)?;

        let summaries =
            load_summaries(&self.fs, &inbox, &self.cache, self.max_concurrent_reads).await?;

        let owner_name = match &self.owner_name_override {
            Some(name) => Some(name.clone()),
            None => load_owner_name(&self.fs, &root).await,
        };

        tracing::info!(
            "[Session] 归档已打开: {} 个会话，所有者: {}",
            summaries.len(),
            owner_name.as_deref().unwrap_or("未知")
        );

        let count = summaries.len();
        self.current = Some(OpenArchive {
            root,
            inbox,
            summaries,
            owner_name,
        });
        Ok(count)
    }

    /// 重新开始：关闭当前归档并清空缓存
    pub fn start_over(&mut self) {
        if self.current.take().is_some() {
            tracing::debug!("[Session] 关闭当前归档");
        }
        self.cache.clear();
    }

    fn open(&self) -> Result<&OpenArchive<F::Dir>, ArchiveError> {
        self.current.as_ref().ok_or(ArchiveError::NoArchiveOpen)
    }

    pub fn owner_name(&self) -> Option<&str> {
        self.current.as_ref()?.owner_name.as_deref()
    }

    /// 会话列表：按时间降序，并按标题/目录名过滤
    pub fn chats(&self, query: &str) -> Vec<ConversationSummary> {
        let Some(current) = &self.current else {
            return Vec::new();
        };

        let mut chats = filter_summaries(&current.summaries, query);
        sort_summaries(&mut chats);
        chats
    }

    /// 选中会话的完整内容
    pub fn conversation(&self, directory_name: &str) -> Result<MessageData, ArchiveError> {
        self.open()?;
        load_detail(&self.cache, directory_name)?
            .ok_or_else(|| ArchiveError::NotLoaded(directory_name.to_string()))
    }

    /// 按发送者分组后的消息
    pub fn grouped_messages(&self, directory_name: &str) -> Result<Vec<Vec<Message>>, ArchiveError> {
        let data = self.conversation(directory_name)?;
        Ok(group_by_sender(data.messages))
    }

    /// 分组显示模型
    pub fn grouped_view(&self, directory_name: &str) -> Result<Vec<MessageGroupView>, ArchiveError> {
        let groups = self.grouped_messages(directory_name)?;
        Ok(build_group_views(&groups, self.owner_name()))
    }

    /// 会话统计；空会话返回 `None`
    pub fn statistics(&self, directory_name: &str) -> Result<Option<ChatStatistics>, ArchiveError> {
        let data = self.conversation(directory_name)?;
        Ok(chat_statistics(&data))
    }

    /// 读取消息附件，缺失时返回 `Ok(None)`
    pub async fn attachment(&self, uri: &str) -> Result<Option<ResolvedAttachment>, ArchiveError> {
        let current = self.open()?;
        Ok(load_attachment(&self.fs, &current.root, uri).await)
    }
}
