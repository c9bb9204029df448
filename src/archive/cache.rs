//! 会话缓存
//!
//! 会话目录名 -> 原始（未解码）JSON 文本。只由加载器在扫描摘要时写入，
//! 会话期间不会自动失效；打开新归档时整体清空。
//!
//! ## 代数（generation）
//!
//! 每次 `clear()` 代数加一。扫描开始时记录代数，写入时代数不符的结果
//! （来自已经被替换的归档）直接丢弃。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 会话 JSON 缓存
#[derive(Debug, Default)]
pub struct ConversationCache {
    entries: RwLock<HashMap<String, Arc<str>>>,
    generation: AtomicU64,
}

impl ConversationCache {
    /// 创建空缓存（打开归档时调用）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<str>> {
        self.entries.read().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// 写入缓存
    ///
    /// 同一键只接受第一次写入；内容不同的重复写入会被拒绝并返回 `false`
    pub fn set(&self, key: &str, text: impl Into<Arc<str>>) -> bool {
        let mut entries = self.entries.write();
        insert_first(&mut entries, key, text.into())
    }

    /// 仅当代数仍为 `generation` 时写入，过期扫描的结果被丢弃
    pub fn set_for_generation(&self, generation: u64, key: &str, text: impl Into<Arc<str>>) -> bool {
        // 持有写锁检查代数，避免与 clear() 交错
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) != generation {
            tracing::debug!("[Cache] 丢弃过期扫描结果: {} (代数 {})", key, generation);
            return false;
        }

        insert_first(&mut entries, key, text.into())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 清空所有条目并进入新的代数
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        entries.clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// 只接受首次写入；相同内容的重复写入视为成功
fn insert_first(entries: &mut HashMap<String, Arc<str>>, key: &str, text: Arc<str>) -> bool {
    match entries.get(key) {
        Some(existing) if *existing == text => true,
        Some(_) => {
            tracing::warn!("[Cache] 拒绝覆盖已缓存的会话: {}", key);
            false
        }
        None => {
            entries.insert(key.to_string(), text);
            true
        }
    }
}
