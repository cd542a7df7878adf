//! 通知渠道 trait 和推送载荷

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// 推送消息体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundPayload {
    /// 标题，没有打印机配置名时省略
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// 消息内容
    pub message: String,
    /// 优先级
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

impl OutboundPayload {
    /// 创建只有消息内容的载荷
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: message.into(),
            priority: None,
        }
    }

    /// 设置标题
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// 设置优先级
    pub fn with_priority(mut self, priority: Option<i64>) -> Self {
        self.priority = priority;
        self
    }
}

/// 通知交给发送路径后的结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 已交给渠道（送达本身尽力而为）
    Sent,
    /// 按策略丢弃
    Skipped(String),
    /// 没有渠道接受该消息
    Failed(String),
}

impl SendResult {
    /// 是否已发送
    pub fn is_sent(&self) -> bool {
        matches!(self, SendResult::Sent)
    }
}

/// 通知渠道 trait
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称，用于日志
    fn name(&self) -> &str;

    /// 异步发送消息，立即返回
    fn send_async(&self, payload: &OutboundPayload) -> Result<()>;

    /// 设置变更后重新配置
    fn reconfigure(&self, _settings: &Settings) {}
}
