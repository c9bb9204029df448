/*!
 * 浏览器配置管理模块
 *
 * 管理归档浏览的本地配置，包括：
 * - 最近打开的归档目录
 * - 扫描时的最大并发读取数
 * - 归档所有者姓名覆盖（autofill 文件缺失时使用）
 *
 * 配置文件: `<config_dir>/chat-archive-viewer/config.json`
 */

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::archive::DEFAULT_MAX_CONCURRENT_READS;

/// 最近归档列表的最大长度
pub const MAX_RECENT_ARCHIVES: usize = 10;

// ============================================================================
// 错误类型
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件写入失败: {0}")]
    WriteFailed(String),
    #[error("目录创建失败: {0}")]
    DirectoryCreationFailed(String),
    #[error("无效的路径: {0}")]
    InvalidPath(String),
}

// ============================================================================
// 配置结构
// ============================================================================

/// 归档浏览配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    /// 最近打开的归档（最新的在前）
    pub recent_archives: Vec<RecentArchive>,
    /// 扫描会话时的最大并发读取数
    pub max_concurrent_reads: usize,
    /// 归档所有者姓名覆盖
    pub owner_name_override: Option<String>,
    /// 配置版本
    pub version: String,
}

/// 最近打开的归档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentArchive {
    pub path: PathBuf,
    pub opened_at: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            recent_archives: vec![],
            max_concurrent_reads: DEFAULT_MAX_CONCURRENT_READS,
            owner_name_override: None,
            version: "1.0".to_string(),
        }
    }
}

impl ViewerConfig {
    /// 最近一次打开的归档
    pub fn last_archive(&self) -> Option<&Path> {
        self.recent_archives.first().map(|r| r.path.as_path())
    }

    /// 实际使用的并发数（至少为 1）
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_reads.max(1)
    }
}

// ============================================================================
// 配置管理
// ============================================================================

/// 配置管理器
pub struct ConfigManager {
    config: ViewerConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// 从默认位置加载
    pub fn load_default() -> Self {
        Self::load(get_config_file_path())
    }

    /// 从指定文件加载，失败时使用默认配置
    pub fn load(config_path: PathBuf) -> Self {
        let config = Self::load_or_default(&config_path);
        Self {
            config,
            config_path,
        }
    }

    /// 加载配置或使用默认值
    fn load_or_default(path: &Path) -> ViewerConfig {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("[Config] 配置已加载: {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("[Config] 配置解析失败，使用默认配置: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("[Config] 配置读取失败，使用默认配置: {}", e);
                }
            }
        }

        tracing::debug!("[Config] 使用默认配置");
        ViewerConfig::default()
    }

    /// 保存配置
    pub fn save(&self) -> Result<(), ConfigError> {
        // 确保父目录存在
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::DirectoryCreationFailed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::WriteFailed(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteFailed(e.to_string()))?;

        tracing::debug!("[Config] 配置已保存: {:?}", self.config_path);
        Ok(())
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 记录打开的归档并保存
    ///
    /// 路径先转为绝对路径，之后从任意目录启动都指向同一归档。
    /// 同一路径只保留最新一条，列表最多保留 [`MAX_RECENT_ARCHIVES`] 条
    pub fn record_archive(&mut self, path: PathBuf) -> Result<(), ConfigError> {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidPath("路径不能为空".to_string()));
        }

        let path = absolute_archive_path(path)?;
        let recent = &mut self.config.recent_archives;
        recent.retain(|r| r.path != path);
        recent.insert(
            0,
            RecentArchive {
                path,
                opened_at: Utc::now().to_rfc3339(),
            },
        );
        recent.truncate(MAX_RECENT_ARCHIVES);

        self.save()
    }

    /// 设置所有者姓名覆盖（`None` 表示使用归档中的信息）
    pub fn set_owner_name_override(&mut self, name: Option<String>) -> Result<(), ConfigError> {
        self.config.owner_name_override = name.filter(|n| !n.trim().is_empty());
        self.save()
    }
}

/// 存在时解析为规范路径，否则基于当前目录补全
fn absolute_archive_path(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if let Ok(canonical) = fs::canonicalize(&path) {
        return Ok(canonical);
    }
    std::path::absolute(&path).map_err(|e| ConfigError::InvalidPath(e.to_string()))
}

/// 获取基础目录
fn get_base_directory() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chat-archive-viewer")
}

/// 获取默认配置文件路径
pub fn get_config_file_path() -> PathBuf {
    get_base_directory().join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let manager = ConfigManager::load(tmp.path().join("config.json"));

        assert_eq!(manager.config(), &ViewerConfig::default());
        assert_eq!(manager.config().concurrency(), DEFAULT_MAX_CONCURRENT_READS);
        assert!(manager.config().last_archive().is_none());
    }

    #[test]
    fn test_corrupt_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ nope").unwrap();

        let manager = ConfigManager::load(path);
        assert_eq!(manager.config(), &ViewerConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, r#"{"maxConcurrentReads": 0}"#).unwrap();

        let manager = ConfigManager::load(path);
        assert_eq!(manager.config().max_concurrent_reads, 0);
        assert_eq!(manager.config().concurrency(), 1);
        assert_eq!(manager.config().version, "1.0");
    }

    #[test]
    fn test_record_archive_dedups_and_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/config.json");
        let mut manager = ConfigManager::load(path.clone());

        manager.record_archive(PathBuf::from("/archives/one")).unwrap();
        manager.record_archive(PathBuf::from("/archives/two")).unwrap();
        manager.record_archive(PathBuf::from("/archives/one")).unwrap();

        let reloaded = ConfigManager::load(path);
        let paths: Vec<_> = reloaded
            .config()
            .recent_archives
            .iter()
            .map(|r| r.path.clone())
            .collect();
        assert_eq!(
            paths,
            vec![PathBuf::from("/archives/one"), PathBuf::from("/archives/two")]
        );
        assert_eq!(reloaded.config().last_archive(), Some(Path::new("/archives/one")));
    }

    #[test]
    fn test_recent_list_is_capped() {
        let tmp = TempDir::new().unwrap();
        let mut manager = ConfigManager::load(tmp.path().join("config.json"));

        for i in 0..(MAX_RECENT_ARCHIVES + 3) {
            manager
                .record_archive(PathBuf::from(format!("/archives/{i}")))
                .unwrap();
        }
        assert_eq!(manager.config().recent_archives.len(), MAX_RECENT_ARCHIVES);
    }

    #[test]
    fn test_empty_path_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut manager = ConfigManager::load(tmp.path().join("config.json"));
        assert!(matches!(
            manager.record_archive(PathBuf::new()),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_relative_archive_is_recorded_absolute() {
        let tmp = TempDir::new().unwrap();
        let mut manager = ConfigManager::load(tmp.path().join("config.json"));

        manager.record_archive(PathBuf::from(".")).unwrap();
        let cwd = std::env::current_dir().unwrap().canonicalize().unwrap();
        assert_eq!(manager.config().last_archive(), Some(cwd.as_path()));

        manager
            .record_archive(PathBuf::from("not_there/messages"))
            .unwrap();
        let recorded = manager.config().last_archive().unwrap();
        assert!(recorded.is_absolute());
        assert!(recorded.ends_with("not_there/messages"));
    }

    #[test]
    fn test_owner_override_blank_is_cleared() {
        let tmp = TempDir::new().unwrap();
        let mut manager = ConfigManager::load(tmp.path().join("config.json"));

        manager.set_owner_name_override(Some("Alice".into())).unwrap();
        assert_eq!(manager.config().owner_name_override.as_deref(), Some("Alice"));

        manager.set_owner_name_override(Some("  ".into())).unwrap();
        assert_eq!(manager.config().owner_name_override, None);
    }
}
