//! G-code 拦截 - 对发往固件的命令分类
//!
//! 只有 `M600`（换料）以及 `M70`、`M117` 两个显示消息命令有意义，
//! 后两者的文本会保留给下一次暂停、等待或换料通知。

use regex::Regex;
use std::sync::OnceLock;

/// 换料
pub const FILAMENT_CHANGE: &str = "M600";
/// 暂停时显示的消息，文本在 3 字节前缀之后
pub const PAUSE_MESSAGE: &str = "M70";
/// LCD 消息，文本在 4 字节前缀之后
pub const DISPLAY_MESSAGE: &str = "M117";
/// 普通移动，太频繁，不推动分钟计时
pub const LINEAR_MOVE: &str = "G1";

/// 命令对通知引擎的含义
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
    /// 触发换料通知
    FilamentChange,
    /// 替换待附加文本
    SetPendingText(String),
    /// 无操作
    Ignore,
}

/// 分类后的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedCommand {
    /// G-code 命令字，如 `M117`
    pub code: Option<String>,
    /// 对应的操作
    pub action: CommandAction,
}

impl InterceptedCommand {
    /// 是否推动分钟计时
    pub fn ticks_clock(&self) -> bool {
        self.code.as_deref().is_some_and(|code| code != LINEAR_MOVE)
    }
}

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:[Nn]\d+\s+)?([GgMmTt]\d+(?:\.\d+)?)").expect("static regex is valid")
    })
}

/// 从原始命令行提取 G-code 命令字
pub fn command_code(raw: &str) -> Option<String> {
    code_pattern()
        .captures(raw)
        .map(|caps| caps[1].to_ascii_uppercase())
}

/// 对命令分类，主机给出的 `parsed_code` 优先于解析 `raw`
pub fn intercept(raw: &str, parsed_code: Option<&str>) -> InterceptedCommand {
    let code = match parsed_code {
        Some(code) if !code.trim().is_empty() => Some(code.trim().to_string()),
        _ => command_code(raw),
    };

    let action = match code.as_deref() {
        Some(FILAMENT_CHANGE) => CommandAction::FilamentChange,
        Some(PAUSE_MESSAGE) => {
            CommandAction::SetPendingText(raw.get(3..).unwrap_or_default().to_string())
        }
        Some(DISPLAY_MESSAGE) => match raw.get(4..) {
            Some(text) if !text.trim().is_empty() => CommandAction::SetPendingText(text.to_string()),
            _ => CommandAction::Ignore,
        },
        _ => CommandAction::Ignore,
    };

    InterceptedCommand { code, action }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_extraction() {
        assert_eq!(command_code("M600").as_deref(), Some("M600"));
        assert_eq!(command_code("  g1 X10 Y10").as_deref(), Some("G1"));
        assert_eq!(command_code("N12 M117 Hello").as_deref(), Some("M117"));
        assert_eq!(command_code("G29.1").as_deref(), Some("G29.1"));
        assert_eq!(command_code("@pause"), None);
        assert_eq!(command_code(""), None);
    }

    #[test]
    fn test_filament_change() {
        let command = intercept("M600", Some("M600"));
        assert_eq!(command.action, CommandAction::FilamentChange);
        assert!(command.ticks_clock());
    }

    #[test]
    fn test_m70_keeps_text_after_prefix() {
        let command = intercept("M70 Insert magnets", Some("M70"));
        assert_eq!(
            command.action,
            CommandAction::SetPendingText(" Insert magnets".to_string())
        );
    }

    #[test]
    fn test_m117_ignores_blank_text() {
        assert_eq!(intercept("M117", Some("M117")).action, CommandAction::Ignore);
        assert_eq!(intercept("M117   ", Some("M117")).action, CommandAction::Ignore);
        assert_eq!(
            intercept("M117 Layer 3", Some("M117")).action,
            CommandAction::SetPendingText("Layer 3".to_string())
        );
    }

    #[test]
    fn test_parsed_code_falls_back_to_raw() {
        let command = intercept("M600", None);
        assert_eq!(command.code.as_deref(), Some("M600"));
        assert_eq!(command.action, CommandAction::FilamentChange);
    }

    #[test]
    fn test_moves_do_not_tick_clock() {
        assert!(!intercept("G1 X1", Some("G1")).ticks_clock());
        assert!(intercept("G28", Some("G28")).ticks_clock());
        assert!(!intercept("@pause", None).ticks_clock());
    }

    #[test]
    fn test_unrecognized_commands_ignored() {
        assert_eq!(intercept("M104 S200", Some("M104")).action, CommandAction::Ignore);
    }
}
