//! 聊天归档浏览命令行
//!
//! 打开本地导出的聊天归档目录，列出会话、显示分组消息、
//! 输出会话统计和导出附件。最近打开的归档记录在配置文件中，
//! 省略归档参数时自动使用。

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chat_archive_viewer_lib::grouping::{MessageBody, MessageView};
use chat_archive_viewer_lib::{
    ArchiveError, ArchiveSession, ChatStatistics, ConfigManager, ConversationSummary, LocalFs,
    MessageGroupView,
};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "chat-archive-viewer")]
#[command(about = "浏览本地导出的聊天归档")]
#[command(version)]
struct Args {
    /// 配置文件路径
    #[arg(long, global = true, env = "CHAT_ARCHIVE_VIEWER_CONFIG")]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出会话（按最后发送时间降序）
    Chats {
        /// 归档目录，省略时使用最近打开的归档
        archive: Option<PathBuf>,
        /// 按标题或目录名过滤
        #[arg(short, long, default_value = "")]
        search: String,
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 显示会话消息（按发送者分组）
    Show {
        /// 会话目录名
        dir: String,
        archive: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// 显示会话统计
    Stats {
        dir: String,
        archive: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// 显示归档所有者姓名
    Owner { archive: Option<PathBuf> },
    /// 导出消息附件
    Attachment {
        /// 消息中的媒体 uri（如 messages/inbox/<会话>/photos/1.jpg）
        uri: String,
        archive: Option<PathBuf>,
        /// 输出文件
        #[arg(short, long)]
        out: PathBuf,
    },
}

impl Command {
    fn archive(&self) -> Option<&Path> {
        match self {
            Command::Chats { archive, .. }
            | Command::Show { archive, .. }
            | Command::Stats { archive, .. }
            | Command::Owner { archive }
            | Command::Attachment { archive, .. } => archive.as_deref(),
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config = match &args.config {
        Some(path) => ConfigManager::load(path.clone()),
        None => ConfigManager::load_default(),
    };

    let archive = args
        .command
        .archive()
        .or_else(|| config.config().last_archive())
        .map(Path::to_path_buf)
        .context("未指定归档目录，且没有最近打开的归档")?;

    let mut session = ArchiveSession::with_config(LocalFs::new(), config.config());
    match session.open_archive(archive.clone()).await {
        Ok(count) => tracing::debug!("[Main] 已打开 {}: {} 个会话", archive.display(), count),
        Err(ArchiveError::NotAnArchive) => {
            bail!("{} 不是有效的聊天归档（缺少 inbox 目录）", archive.display())
        }
        Err(e) => {
            return Err(e).with_context(|| format!("打开归档失败: {}", archive.display()));
        }
    }

    if let Err(e) = config.record_archive(archive) {
        tracing::warn!("[Config] 保存最近归档失败: {}", e);
    }

    match args.command {
        Command::Chats { search, json, .. } => {
            let chats = session.chats(&search);
            if json {
                println!("{}", serde_json::to_string_pretty(&chats)?);
            } else {
                print_chats(&chats);
            }
        }
        Command::Show { dir, json, .. } => {
            let groups = session.grouped_view(&dir)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else {
                print_groups(&groups);
            }
        }
        Command::Stats { dir, json, .. } => match session.statistics(&dir)? {
            Some(stats) if json => println!("{}", serde_json::to_string_pretty(&stats)?),
            Some(stats) => print_statistics(&stats),
            None => println!("会话没有消息"),
        },
        Command::Owner { .. } => match session.owner_name() {
            Some(name) => println!("{name}"),
            None => println!("（未知）"),
        },
        Command::Attachment { uri, out, .. } => {
            let Some(attachment) = session.attachment(&uri).await? else {
                bail!("附件不存在: {uri}");
            };
            tokio::fs::write(&out, &attachment.bytes)
                .await
                .with_context(|| format!("写入失败: {}", out.display()))?;
            println!(
                "{} -> {} ({}, {} 字节)",
                attachment.path,
                out.display(),
                attachment.content_type,
                attachment.bytes.len()
            );
        }
    }

    Ok(())
}

// ============================================================================
// 输出
// ============================================================================

/// 本地时间
fn format_timestamp(timestamp_ms: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => timestamp_ms.to_string(),
    }
}

fn print_chats(chats: &[ConversationSummary]) {
    if chats.is_empty() {
        println!("没有会话");
        return;
    }
    for chat in chats {
        println!(
            "{}  {}  [{}]",
            format_timestamp(chat.last_sent_at_ms),
            chat.title,
            chat.directory_name
        );
    }
}

fn print_groups(groups: &[MessageGroupView]) {
    for group in groups {
        let marker = if group.is_me { "（我）" } else { "" };
        println!("{}{}", group.sender_name, marker);
        for message in &group.messages {
            print_message(message);
        }
        println!();
    }
}

fn print_message(message: &MessageView) {
    let time = format_timestamp(message.timestamp_ms);
    let unsent = if message.is_unsent { " (已撤回)" } else { "" };

    match &message.body {
        MessageBody::Text { text } => println!("  [{time}]{unsent} {text}"),
        MessageBody::Photos { uris, caption } => {
            for uri in uris {
                println!("  [{time}]{unsent} [图片] {uri}");
            }
            if let Some(caption) = caption {
                println!("      {caption}");
            }
        }
        MessageBody::Link { url, text } => println!("  [{time}]{unsent} {text} <{url}>"),
        MessageBody::Hidden => return,
        MessageBody::Unsupported { raw_json } => {
            println!("  [{time}]{unsent} Not implemented: {raw_json}")
        }
    }

    for reaction in &message.reactions {
        println!("      {} {}", reaction.reaction, reaction.actors.join(", "));
    }
}

fn print_statistics(stats: &ChatStatistics) {
    println!("消息数: {}", stats.message_count);
    println!("成员数: {}", stats.member_count);
    println!("创建时间: {}", format_timestamp(stats.created_at_ms));
    println!();
    for share in &stats.sender_counts {
        println!("  {:<24} {:>6}  {:>5.1}%", share.sender_name, share.count, share.percent);
    }
}
