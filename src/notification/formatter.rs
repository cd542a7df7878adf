//! 事件格式化器 - 把事件和载荷转换成消息
//!
//! 已知类型可以注册处理函数。处理函数更新会话状态并返回模板上下文，
//! 返回 `None` 表示抑制该事件。没有处理函数的类型和未知事件名
//! 用载荷的顶层标量字段渲染配置的模板。

use chrono::{DateTime, Utc};
use tracing::debug;

use super::template::{render, TemplateContext, TemplateError};
use crate::event::{EventKind, EventPayload};
use crate::settings::EventRule;
use crate::state::{SessionState, SharedSession};

/// 视为首层完成的最小 Z 高度
pub const FIRST_LAYER_MIN_Z: f64 = 2.0;

type Handler = fn(&mut SessionState, &EventPayload, DateTime<Utc>) -> Option<TemplateContext>;

const HANDLERS: &[(EventKind, Handler)] = &[
    (EventKind::PrintStarted, print_started),
    (EventKind::PrintDone, print_done),
    (EventKind::PrintFailed, print_failed),
    (EventKind::FilamentChange, filament_change),
    (EventKind::PrintPaused, print_paused),
    (EventKind::Waiting, print_paused),
    (EventKind::ZChange, z_change),
    (EventKind::Startup, no_context),
    (EventKind::Shutdown, no_context),
    (EventKind::Error, error),
];

/// 查找类型对应的处理函数
fn handler_for(kind: EventKind) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(registered, _)| *registered == kind)
        .map(|(_, handler)| *handler)
}

/// 类型是否有处理函数
pub fn has_handler(kind: EventKind) -> bool {
    handler_for(kind).is_some()
}

/// 没有生成消息的原因
#[derive(Debug, Clone, PartialEq)]
pub enum SuppressReason {
    /// 处理函数的条件不满足
    HandlerDeclined,
    /// 没有规则或没有消息模板
    NoTemplate,
    /// 模板渲染失败
    Template(TemplateError),
    /// 渲染结果为空
    Empty,
}

/// 格式化结果
#[derive(Debug, Clone, PartialEq)]
pub enum Formatted {
    Message(String),
    Suppressed(SuppressReason),
}

/// 运行 `name` 对应的处理函数并渲染规则模板
///
/// 没有模板时处理函数照常运行，PrintStarted 等状态切换不受规则配置影响。
/// `rule` 是提供模板的规则，由调用方决定（Waiting 传入 PrintPaused 的规则）。
pub fn format_event(
    name: &str,
    payload: &EventPayload,
    session: &SharedSession,
    rule: Option<&EventRule>,
    now: DateTime<Utc>,
) -> Formatted {
    let context = match EventKind::from_name(name).and_then(handler_for) {
        Some(handler) => session.with(|state| handler(state, payload, now)),
        // 无处理函数时用载荷字段作为上下文，无占位符的模板原样输出
        None => Some(payload_context(payload)),
    };

    let Some(context) = context else {
        debug!(event = %name, "Handler declined the event");
        return Formatted::Suppressed(SuppressReason::HandlerDeclined);
    };

    let Some(template) = rule.and_then(|rule| rule.message.as_deref()) else {
        return Formatted::Suppressed(SuppressReason::NoTemplate);
    };

    match render(template, &context) {
        Ok(message) if message.trim().is_empty() => Formatted::Suppressed(SuppressReason::Empty),
        Ok(message) => Formatted::Message(message),
        Err(e) => Formatted::Suppressed(SuppressReason::Template(e)),
    }
}

/// 用载荷的顶层标量字段构建上下文
pub fn payload_context(payload: &EventPayload) -> TemplateContext {
    let mut context = TemplateContext::new();
    for (key, value) in payload.scalars() {
        context.insert(key, value);
    }
    context
}

fn print_started(
    state: &mut SessionState,
    _payload: &EventPayload,
    now: DateTime<Utc>,
) -> Option<TemplateContext> {
    state.begin_job(now);
    Some(TemplateContext::new())
}

fn print_done(
    state: &mut SessionState,
    payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    state.finish_job();
    let elapsed_time = payload
        .number_field("time")
        .map(|secs| format_elapsed(secs.max(0.0) as u64))
        .unwrap_or_default();
    Some(
        TemplateContext::new()
            .with("file", file_name(payload))
            .with("elapsed_time", elapsed_time),
    )
}

fn print_failed(
    state: &mut SessionState,
    payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    state.fail_job();
    Some(TemplateContext::new().with("file", file_name(payload)))
}

fn filament_change(
    state: &mut SessionState,
    _payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    Some(TemplateContext::new().with("m70_cmd", state.pending_text_wrapped()))
}

fn print_paused(
    state: &mut SessionState,
    _payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    Some(TemplateContext::new().with("m70_cmd", &state.pending_command_text))
}

fn z_change(
    state: &mut SessionState,
    payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    if !state.is_printing || !state.first_layer_pending {
        return None;
    }
    let new = payload.number_field("new")?;
    let old = payload.get("old")?;
    if new < FIRST_LAYER_MIN_Z {
        return None;
    }
    state.take_first_layer();

    let old = match old {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    Some(
        TemplateContext::new()
            .with("new", format_reading(new))
            .with("old", old),
    )
}

fn no_context(
    _state: &mut SessionState,
    _payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    Some(TemplateContext::new())
}

fn error(
    state: &mut SessionState,
    payload: &EventPayload,
    _now: DateTime<Utc>,
) -> Option<TemplateContext> {
    if !state.is_printing {
        return None;
    }
    Some(TemplateContext::new().with("error", payload.text_field("error").unwrap_or_default()))
}

/// 载荷 `name` 路径的文件名，缺失时为空
fn file_name(payload: &EventPayload) -> String {
    payload
        .str_field("name")
        .map(|path| path.rsplit(['/', '\\']).next().unwrap_or(path).to_string())
        .unwrap_or_default()
}

/// `1h 2m 5s` 格式的时长，小时和分钟为零时省略
pub fn format_elapsed(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    parts.push(format!("{}s", seconds));
    parts.join(" ")
}

/// 整数不带小数部分，其他原样输出
pub fn format_reading(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
