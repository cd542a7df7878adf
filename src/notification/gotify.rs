//! Gotify 客户端模块
//!
//! 通过 `POST {base_url}/message?token=...` 推送消息

use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use std::sync::{Mutex, RwLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, info};

use super::channel::{NotificationChannel, OutboundPayload, SendResult};
use crate::settings::Settings;
use crate::state::{lock_or_recover, read_or_recover, write_or_recover};

/// 测试通知标题
pub const TEST_TITLE: &str = "OctoPrint push test";
/// 测试通知内容
pub const TEST_MESSAGE: &str = "pewpewpew!! OctoPrint works. \u{1F680}";

/// Gotify 客户端配置
#[derive(Debug, Clone, PartialEq)]
pub struct GotifyConfig {
    /// 服务器地址 (如 https://push.example.com)
    pub base_url: Option<String>,
    /// 应用 token
    pub token: Option<String>,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for GotifyConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

impl GotifyConfig {
    /// 从设置创建配置
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.gotify_server_base_url.clone(),
            token: settings.token.clone(),
            ..Self::default()
        }
    }

    /// 完整的消息接口地址，没有服务器地址时为 `None`
    pub fn message_url(&self) -> Option<String> {
        let base = self.base_url.as_deref()?.trim();
        if base.is_empty() {
            return None;
        }
        Some(format!("{}/message", base.trim_end_matches('/')))
    }
}

/// Gotify 推送渠道
#[derive(Debug)]
pub struct GotifyChannel {
    client: Client,
    config: RwLock<GotifyConfig>,
    /// 仍在进行的异步发送
    in_flight: Mutex<JoinSet<()>>,
}

impl GotifyChannel {
    /// 创建新的 Gotify 客户端
    pub fn new(config: GotifyConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config: RwLock::new(config),
            in_flight: Mutex::new(JoinSet::new()),
        })
    }

    /// 当前配置的副本
    pub fn config(&self) -> GotifyConfig {
        read_or_recover(&self.config).clone()
    }

    /// 发送并等待服务器响应，错误会返回给调用方
    pub async fn send(&self, payload: &OutboundPayload) -> Result<SendResult> {
        let config = self.config();
        let token = config.token.clone().unwrap_or_default();
        post_message(&self.client, &config, &token, payload).await?;
        Ok(SendResult::Sent)
    }

    /// 发送测试通知，`token` 非空时优先使用
    pub async fn send_test(&self, token: Option<&str>) -> Result<()> {
        let config = self.config();
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => config.token.clone().unwrap_or_default(),
        };
        let payload = OutboundPayload::new(TEST_MESSAGE).with_title(TEST_TITLE);
        post_message(&self.client, &config, &token, &payload).await
    }

    /// 等待所有异步发送完成
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *lock_or_recover(&self.in_flight));
        while pending.join_next().await.is_some() {}
    }

    /// 尚未回收的发送数量
    pub fn pending(&self) -> usize {
        lock_or_recover(&self.in_flight).len()
    }
}

impl NotificationChannel for GotifyChannel {
    fn name(&self) -> &str {
        "gotify"
    }

    fn send_async(&self, payload: &OutboundPayload) -> Result<()> {
        let config = self.config();
        if config.message_url().is_none() {
            bail!("gotify_server_base_url is not configured");
        }
        let handle =
            Handle::try_current().map_err(|_| anyhow!("No async runtime to send on"))?;

        let client = self.client.clone();
        let token = config.token.clone().unwrap_or_default();
        let payload = payload.clone();

        let mut in_flight = lock_or_recover(&self.in_flight);
        // 顺便回收已完成的任务
        while in_flight.try_join_next().is_some() {}
        in_flight.spawn_on(
            async move {
                if let Err(e) = post_message(&client, &config, &token, &payload).await {
                    info!(error = %e, "Could not send message");
                }
            },
            &handle,
        );
        Ok(())
    }

    fn reconfigure(&self, settings: &Settings) {
        let mut config = write_or_recover(&self.config);
        let timeout_secs = config.timeout_secs;
        *config = GotifyConfig {
            timeout_secs,
            ..GotifyConfig::from_settings(settings)
        };
        debug!(base_url = ?config.base_url, "Gotify channel reconfigured");
    }
}

async fn post_message(
    client: &Client,
    config: &GotifyConfig,
    token: &str,
    payload: &OutboundPayload,
) -> Result<()> {
    let url = config
        .message_url()
        .ok_or_else(|| anyhow!("gotify_server_base_url is not configured"))?;

    let response = client
        .post(&url)
        .query(&[("token", token)])
        .json(payload)
        .send()
        .await
        .context("HTTP request failed")?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(status = %status, body = %body, "Response");

    if !status.is_success() {
        bail!("Gotify returned {}: {}", status, body);
    }
    Ok(())
}
