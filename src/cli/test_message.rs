//! Test 命令 - 发送测试通知并报告结果

use anyhow::Result;
use clap::Args;
use serde_json::{json, Value};
use std::path::Path;

use super::{build_gotify, load_settings};
use crate::notification::GotifyChannel;

/// Test 命令参数
#[derive(Args)]
pub struct TestArgs {
    /// 用于测试的 token，替代已配置的
    #[arg(long)]
    pub token: Option<String>,
}

/// `{"success": true}` 或 `{"success": false, "msg": ...}`
pub async fn test_outcome(channel: &GotifyChannel, token: Option<&str>) -> Value {
    match channel.send_test(token).await {
        Ok(()) => json!({"success": true}),
        Err(e) => json!({"success": false, "msg": format!("{:#}", e)}),
    }
}

/// 处理 test 命令，返回服务器是否接受了消息
pub async fn handle_test(args: TestArgs, settings_path: &Path) -> Result<bool> {
    let settings = load_settings(settings_path)?;
    let channel = build_gotify(&settings)?;

    let outcome = test_outcome(&channel, args.token.as_deref()).await;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(outcome["success"] == json!(true))
}
