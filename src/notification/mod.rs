//! 通知模块 - 格式化、模板和发送渠道
//!
//! # 流程
//! 1. `formatter` 用规则模板把事件转换成消息
//! 2. `dispatcher` 构建推送载荷（标题、优先级）
//! 3. 每个注册的 `NotificationChannel` 异步发送，不阻塞调用方
//!
//! # 示例
//! ```ignore
//! use printer_notify::notification::{GotifyChannel, GotifyConfig, NotificationDispatcher};
//! use std::sync::Arc;
//!
//! let gotify = Arc::new(GotifyChannel::new(GotifyConfig::default())?);
//! let dispatcher = NotificationDispatcher::new().with_channel(gotify);
//! ```

pub mod channel;
pub mod dispatcher;
pub mod formatter;
pub mod gotify;
pub mod template;

pub use channel::{NotificationChannel, OutboundPayload, SendResult};
pub use dispatcher::{normalize_priority, NotificationDispatcher};
pub use formatter::{format_elapsed, format_event, Formatted, SuppressReason};
pub use gotify::{GotifyChannel, GotifyConfig};
pub use template::{render, TemplateContext, TemplateError};
