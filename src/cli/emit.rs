//! Emit 命令 - 让单个事件走完整的处理流程

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::{build_gotify, load_settings};
use crate::engine::NotifyEngine;
use crate::notification::{NotificationDispatcher, SendResult};
use crate::printer::Disconnected;

/// Emit 命令参数
#[derive(Args)]
pub struct EmitArgs {
    /// 事件名，如 PrintDone
    #[arg(long, short)]
    pub event: String,

    /// JSON 对象格式的事件载荷
    #[arg(long)]
    pub payload: Option<String>,

    /// 只打印载荷，不实际发送
    #[arg(long)]
    pub dry_run: bool,
}

/// 解析 `--payload` 参数
pub fn parse_payload(raw: Option<&str>) -> Result<Option<Value>> {
    raw.map(serde_json::from_str::<Value>)
        .transpose()
        .context("--payload is not valid JSON")
}

/// 处理 emit 命令
pub async fn handle_emit(args: EmitArgs, settings_path: &Path) -> Result<()> {
    let payload = parse_payload(args.payload.as_deref())?;
    let settings = load_settings(settings_path)?;
    let gotify = build_gotify(&settings)?;
    let dispatcher = NotificationDispatcher::new()
        .with_dry_run(args.dry_run)
        .with_channel(gotify.clone());
    let engine = NotifyEngine::new(settings, Arc::new(Disconnected), dispatcher);

    let result = engine.on_event(&args.event, payload);
    gotify.flush().await;

    match result {
        SendResult::Sent => println!("✅ {} sent", args.event),
        SendResult::Skipped(reason) => println!("⏭️  {} skipped: {}", args.event, reason),
        SendResult::Failed(error) => bail!("Failed to send {}: {}", args.event, error),
    }
    Ok(())
}
