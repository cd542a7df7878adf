//! 事件通知规则和内置默认规则

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::event::EventKind;

/// 设置界面可能存成数字或数字字符串的整数设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseInt {
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    Text(String),
}

impl LooseInt {
    /// 整数值（`"2"`、`2` 和 `2.0` 都可以）
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LooseInt::Int(value) => Some(*value),
            LooseInt::Float(value) if value.fract() == 0.0 => Some(*value as i64),
            LooseInt::Float(_) => None,
            LooseInt::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<i64> for LooseInt {
    fn from(value: i64) -> Self {
        LooseInt::Int(value)
    }
}

impl From<&str> for LooseInt {
    fn from(value: &str) -> Self {
        LooseInt::Text(value.to_string())
    }
}

/// 单个事件类型的格式化和发送规则
///
/// `name`、`help`、`custom`、`hidden` 只用于设置界面，
/// 发送只看 `message`、`priority` 和 `mod`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRule {
    /// 设置界面显示名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// 设置界面帮助文本
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// 带 `{placeholder}` 占位符的消息模板
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 推送优先级，`null` 表示不发送
    ///
    /// 始终写出，保存再加载后禁用状态不丢失。
    #[serde(default)]
    pub priority: Option<LooseInt>,
    /// Scheduled（分钟）和 Progress（百分比）的步长
    #[serde(default, rename = "mod", skip_serializing_if = "Option::is_none")]
    pub divisor: Option<LooseInt>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    /// 用户自定义的事件
    pub custom: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    /// 在设置界面隐藏
    pub hidden: bool,
}

impl EventRule {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(LooseInt::Int(priority));
        self
    }

    fn priority_text(mut self, priority: &str) -> Self {
        self.priority = Some(LooseInt::from(priority));
        self
    }

    fn periodic(mut self) -> Self {
        self.divisor = Some(LooseInt::Int(0));
        self.custom = true;
        self
    }

    fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// 是否配置了优先级（0 也算）
    pub fn has_priority(&self) -> bool {
        self.priority.is_some()
    }

    /// 正的步长，未设置或为 0 时返回 `None`
    pub fn divisor(&self) -> Option<i64> {
        self.divisor
            .as_ref()
            .and_then(LooseInt::as_i64)
            .filter(|divisor| *divisor > 0)
    }

    /// 设置步长
    pub fn with_divisor(mut self, divisor: i64) -> Self {
        self.divisor = Some(LooseInt::Int(divisor));
        self
    }

    /// 设置或清除优先级
    pub fn with_priority(mut self, priority: Option<LooseInt>) -> Self {
        self.priority = priority;
        self
    }

    /// 替换消息模板
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// 默认消息中使用的 emoji
pub mod emoji {
    pub const ROCKET: &str = "\u{1F680}";
    pub const CLOCK: &str = "\u{23F0}";
    pub const TEMP: &str = "\u{1F321}";
    pub const FOUR_LEAF_CLOVER: &str = "\u{1F340}";
    pub const WAVING_HAND: &str = "\u{1F44B}";
}

const PENDING_TEXT_HELP: &str =
    "When a <code>m70</code> was sent to the printer, the message will be appended to the notification.";

/// 所有已知事件类型的默认规则
pub fn default_rules() -> BTreeMap<String, EventRule> {
    EventKind::ALL
        .iter()
        .map(|kind| (kind.as_str().to_string(), default_rule(*kind)))
        .collect()
}

/// 单个类型的默认规则
pub fn default_rule(kind: EventKind) -> EventRule {
    match kind {
        EventKind::Scheduled => EventRule::new(format!(
            "Scheduled Notification: {{elapsed_time}} Minutes Elapsed{}",
            emoji::CLOCK
        ))
        .priority_text("0")
        .periodic(),
        EventKind::Progress => EventRule::new("Print Progress: {percentage}%")
            .priority_text("0")
            .periodic(),
        EventKind::TempReached => EventRule::new(format!(
            "{}Temperature Reached! Bed: {{bed_temp}}/{{bed_target}} | Extruder: {{e1_temp}}/{{e1_target}}",
            emoji::TEMP
        ))
        .named("Temperature Reached")
        .priority_text("0"),
        EventKind::Shutdown => {
            EventRule::new(format!("Bye bye, I am shutting down {}", emoji::WAVING_HAND))
                .named("Printer Shutdown")
                .priority_text("0")
        }
        // 没有优先级，启动问候需要用户开启
        EventKind::Startup => EventRule::new(format!(
            "Hello, Let's print something nice today {}",
            emoji::WAVING_HAND
        ))
        .named("Printer Startup"),
        EventKind::PrintStarted => EventRule::new("Print Job Started")
            .named("Print Started")
            .priority_text("0"),
        EventKind::PrintDone => EventRule::new(
            "Print Job Finished: {file}, Finished Printing in {elapsed_time}",
        )
        .named("Print Done")
        .priority_text("0"),
        EventKind::PrintFailed => EventRule::new("Print Job Failed: {file}")
            .named("Print Failed")
            .priority(0),
        EventKind::PrintPaused => EventRule::new("Print Job Paused {m70_cmd}")
            .named("Print Paused")
            .help(&format!(
                "Send a notification when a Pause event is received. {}",
                PENDING_TEXT_HELP
            ))
            .priority(0),
        EventKind::Waiting => EventRule::new("Printer is Waiting {m70_cmd}")
            .named("Printer is Waiting")
            .help(&format!(
                "Send a notification when a Waiting event is received. {}",
                PENDING_TEXT_HELP
            ))
            .priority(0),
        EventKind::FilamentChange => EventRule::new("Please change the filament {m70_cmd}")
            .named("Filament Change")
            .help(&format!(
                "Send a notification when a M600 (Filament Change) command is received. {}",
                PENDING_TEXT_HELP
            ))
            .priority(0),
        EventKind::ZChange => EventRule::new(format!(
            "First couple of layers are done {}",
            emoji::FOUR_LEAF_CLOVER
        ))
        .named("After first couple of layer")
        .help("Send a notification when the 'first' couple of layers is done.")
        .priority(0),
        EventKind::Alert => EventRule::new("Alert! The printer issued a alert (beep) via M300")
            .named("Alert Event (M300)")
            .priority(1)
            .hidden(),
        EventKind::EStop => EventRule::new("Panic!! The printer issued a panic stop (M112)")
            .named("Panic Event (M112)")
            .priority(1)
            .hidden(),
        EventKind::Error => EventRule::new(
            "Error!! An error has occurred in the printer communication. {error}",
        )
        .named("Error Event")
        .help("This event occurs when for example your temperature sensor disconnects.")
        .priority(1)
        .hidden(),
    }
}
