//! 主机事件 - 已知事件类型和弱类型载荷

use serde_json::{Map, Value};
use std::fmt;

/// 引擎内置规则的事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// 由命令流推算的已用分钟数
    Scheduled,
    /// 打印进度百分比
    Progress,
    /// 热床或挤出头达到目标温度
    TempReached,
    Shutdown,
    Startup,
    PrintStarted,
    PrintDone,
    PrintFailed,
    PrintPaused,
    /// 主机等待用户操作，使用 PrintPaused 的模板
    Waiting,
    /// M600 或显式的换料事件
    FilamentChange,
    /// Z 高度变化，用于判断首层完成
    ZChange,
    /// 固件蜂鸣 (M300)
    Alert,
    /// 紧急停止 (M112)
    EStop,
    /// 打印机通信错误
    Error,
}

impl EventKind {
    /// 所有已知类型
    pub const ALL: [EventKind; 15] = [
        EventKind::Scheduled,
        EventKind::Progress,
        EventKind::TempReached,
        EventKind::Shutdown,
        EventKind::Startup,
        EventKind::PrintStarted,
        EventKind::PrintDone,
        EventKind::PrintFailed,
        EventKind::PrintPaused,
        EventKind::Waiting,
        EventKind::FilamentChange,
        EventKind::ZChange,
        EventKind::Alert,
        EventKind::EStop,
        EventKind::Error,
    ];

    /// 主机上报的事件名
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Scheduled => "Scheduled",
            EventKind::Progress => "Progress",
            EventKind::TempReached => "TempReached",
            EventKind::Shutdown => "Shutdown",
            EventKind::Startup => "Startup",
            EventKind::PrintStarted => "PrintStarted",
            EventKind::PrintDone => "PrintDone",
            EventKind::PrintFailed => "PrintFailed",
            EventKind::PrintPaused => "PrintPaused",
            EventKind::Waiting => "Waiting",
            EventKind::FilamentChange => "FilamentChange",
            EventKind::ZChange => "ZChange",
            EventKind::Alert => "Alert",
            EventKind::EStop => "EStop",
            EventKind::Error => "Error",
        }
    }

    /// 按事件名精确查找（区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// 渲染消息时使用哪个类型的模板
    ///
    /// Waiting 使用 PrintPaused 的模板，其他类型使用自己的。
    pub fn template_kind(self) -> EventKind {
        match self {
            EventKind::Waiting => EventKind::PrintPaused,
            other => other,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 主机下发的事件载荷
///
/// 缺失或非对象的载荷视为空，值为 `null` 的字段视为缺失。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPayload(Map<String, Value>);

impl EventPayload {
    /// 创建空载荷
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 JSON 值创建载荷
    pub fn from_value(value: Option<Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self(map),
            _ => Self::default(),
        }
    }

    /// 字段值，缺失或为 `null` 时返回 `None`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// 字符串字段
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// 数值字段，也接受数字字符串
    pub fn number_field(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// 字段的显示文本，字符串原样返回
    pub fn text_field(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    /// 顶层标量字段，返回 `(键, 显示文本)`
    pub fn scalars(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.0.iter().filter_map(|(key, value)| {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => return None,
            };
            Some((key.as_str(), text))
        })
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for EventPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
