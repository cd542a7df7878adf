//! 通知分发器 - 构建推送载荷并分发到各渠道

use super::channel::{NotificationChannel, OutboundPayload, SendResult};
use crate::printer::PrinterState;
use crate::settings::{LooseInt, Settings};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 消息标题前缀，后接打印机配置名
pub const TITLE_PREFIX: &str = "Octoprint";

/// 通知分发器 - 管理多个渠道并路由消息
pub struct NotificationDispatcher {
    /// 所有注册的渠道
    channels: Vec<Arc<dyn NotificationChannel>>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 添加渠道（builder 风格）
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.register_channel(channel);
        self
    }

    /// 注册渠道
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(channel = channel.name(), "Registering notification channel");
        self.channels.push(channel);
    }

    /// 构建载荷：整数优先级，配置名作标题
    pub fn build_payload(
        &self,
        message: String,
        priority: Option<&LooseInt>,
        printer: &dyn PrinterState,
    ) -> OutboundPayload {
        let mut payload = OutboundPayload::new(message).with_priority(normalize_priority(priority));
        if let Some(profile) = printer.profile_name() {
            payload = payload.with_title(format!("{}: {}", TITLE_PREFIX, profile));
        }
        payload
    }

    /// 构建并发送
    pub fn notify(
        &self,
        message: String,
        priority: Option<&LooseInt>,
        printer: &dyn PrinterState,
    ) -> SendResult {
        let payload = self.build_payload(message, priority, printer);
        self.dispatch(&payload)
    }

    /// 异步发送到所有渠道，不等待结果
    pub fn dispatch(&self, payload: &OutboundPayload) -> SendResult {
        if self.dry_run {
            eprintln!(
                "[DRY-RUN] Would send: {}",
                serde_json::to_string(payload).unwrap_or_default()
            );
            return SendResult::Skipped("dry-run".to_string());
        }

        if self.channels.is_empty() {
            debug!("No notification channel registered, dropping message");
            return SendResult::Skipped("no channel".to_string());
        }

        let mut accepted = 0;
        let mut last_error = String::new();
        for channel in &self.channels {
            match channel.send_async(payload) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "Channel async send failed");
                    last_error = e.to_string();
                }
            }
        }

        if accepted > 0 {
            SendResult::Sent
        } else {
            SendResult::Failed(last_error)
        }
    }

    /// 把新设置转发给所有渠道
    pub fn reconfigure(&self, settings: &Settings) {
        for channel in &self.channels {
            channel.reconfigure(settings);
        }
    }

    /// 已注册渠道数量
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// 所有渠道名称
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 优先级转为整数，数字字符串会被转换，其他值丢弃
pub fn normalize_priority(priority: Option<&LooseInt>) -> Option<i64> {
    let priority = priority?;
    let value = priority.as_i64();
    if value.is_none() {
        warn!(priority = ?priority, "Priority is not an integer, sending without one");
    }
    value
}
