//! 通知引擎 - 主机事件、打印进度、固件命令和温度轮询的入口
//!
//! 每个入口都返回 [`SendResult`] 说明发生了什么，不会把错误抛回主机。
//! 策略性丢弃记 debug 日志，模板问题记 warn 日志。

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, RwLock, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::event::{EventKind, EventPayload};
use crate::gcode::{self, CommandAction};
use crate::notification::formatter::{format_event, format_reading, Formatted, SuppressReason};
use crate::notification::template::{render, TemplateContext};
use crate::notification::{NotificationDispatcher, SendResult};
use crate::poller::{PeriodicTask, DEFAULT_POLL_INTERVAL};
use crate::printer::{Heater, PrinterState};
use crate::settings::{EventRule, LooseInt, Settings};
use crate::state::{read_or_recover, write_or_recover, SessionState, SharedSession};

/// 通知引擎 - 持有设置、会话状态、打印机状态和分发器
pub struct NotifyEngine {
    settings: RwLock<Settings>,
    session: SharedSession,
    printer: Arc<dyn PrinterState>,
    dispatcher: NotificationDispatcher,
    /// 温度轮询任务
    poller: PeriodicTask,
}

impl NotifyEngine {
    /// 创建新的引擎，使用默认轮询间隔
    pub fn new(
        settings: Settings,
        printer: Arc<dyn PrinterState>,
        dispatcher: NotificationDispatcher,
    ) -> Arc<Self> {
        Self::with_poll_interval(settings, printer, dispatcher, DEFAULT_POLL_INTERVAL)
    }

    /// 创建新的引擎，自定义温度轮询间隔
    pub fn with_poll_interval(
        settings: Settings,
        printer: Arc<dyn PrinterState>,
        dispatcher: NotificationDispatcher,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|engine: &Weak<Self>| {
            // 轮询任务只持有弱引用，引擎释放后不再触发
            let engine = engine.clone();
            let poller = PeriodicTask::new("temperature-poller", poll_interval, move || {
                if let Some(engine) = engine.upgrade() {
                    engine.check_temperatures();
                }
            });
            Self {
                settings: RwLock::new(settings),
                session: SharedSession::new(),
                printer,
                dispatcher,
                poller,
            }
        })
    }

    /// 启动温度轮询
    pub fn start(&self) {
        info!(channels = ?self.dispatcher.channel_names(), "Notification engine started");
        self.poller.restart();
    }

    /// 停止温度轮询
    pub fn shutdown(&self) {
        self.poller.stop();
    }

    /// 温度轮询是否在运行
    pub fn is_poller_running(&self) -> bool {
        self.poller.is_running()
    }

    /// 当前设置的副本
    pub fn settings(&self) -> Settings {
        read_or_recover(&self.settings).clone()
    }

    /// 替换设置，重新配置渠道并重启轮询
    pub fn update_settings(&self, settings: Settings) {
        self.dispatcher.reconfigure(&settings);
        *write_or_recover(&self.settings) = settings;
        self.poller.restart();
        info!("Settings updated");
    }

    /// 会话状态的副本
    pub fn session(&self) -> SessionState {
        self.session.snapshot()
    }

    fn rule(&self, name: &str) -> Option<EventRule> {
        read_or_recover(&self.settings).rule(name).cloned()
    }

    fn rule_for(&self, kind: EventKind) -> Option<EventRule> {
        self.rule(kind.as_str())
    }

    /// 渲染消息所用的规则；Waiting 借用 PrintPaused 的模板
    fn template_rule(&self, name: &str, rule: Option<&EventRule>) -> Option<EventRule> {
        match EventKind::from_name(name) {
            Some(kind) if kind.template_kind() != kind => self.rule_for(kind.template_kind()),
            _ => rule.cloned(),
        }
    }

    /// 主机事件回调
    pub fn on_event(&self, name: &str, payload: Option<Value>) -> SendResult {
        self.on_event_at(name, payload, Utc::now())
    }

    /// 主机事件回调，指定当前时间
    pub fn on_event_at(&self, name: &str, payload: Option<Value>, now: DateTime<Utc>) -> SendResult {
        let payload = EventPayload::from_value(payload);
        debug!(event = %name, payload = ?payload, "Got an event");

        let rule = self.rule(name);
        let template_rule = self.template_rule(name, rule.as_ref());
        let formatted = format_event(name, &payload, &self.session, template_rule.as_ref(), now);

        if EventKind::from_name(name) == Some(EventKind::PrintStarted) {
            self.poller.restart();
        }

        let message = match formatted {
            Formatted::Message(message) => message,
            Formatted::Suppressed(SuppressReason::Template(e)) => {
                warn!(event = %name, error = %e, "Could not render message template");
                return SendResult::Skipped(format!("template error: {}", e));
            }
            Formatted::Suppressed(reason) => {
                debug!(event = %name, reason = ?reason, "No message for event");
                return SendResult::Skipped("no message".to_string());
            }
        };

        // 门控始终使用事件自身的规则和优先级
        let Some(rule) = rule else {
            debug!(event = %name, "Event is not configured");
            return SendResult::Skipped("unknown event".to_string());
        };

        if !rule.has_priority() {
            debug!(event = %name, "Event has no priority");
            return SendResult::Skipped("no priority".to_string());
        }

        debug!(event = %name, "Event triggered");
        self.dispatcher
            .notify(message, rule.priority.as_ref(), self.printer.as_ref())
    }

    /// 打印进度回调，progress 取值 0..=100
    ///
    /// 使用 Progress 规则的模板和步长，发送时使用 Scheduled 规则的优先级。
    pub fn on_progress(&self, storage: &str, path: &str, progress: i64) -> SendResult {
        let Some(rule) = self.rule_for(EventKind::Progress) else {
            return SendResult::Skipped("no progress rule".to_string());
        };
        let Some(divisor) = rule.divisor() else {
            return SendResult::Skipped("progress notifications disabled".to_string());
        };
        if progress <= 0 || progress % divisor != 0 {
            return SendResult::Skipped("not a reporting step".to_string());
        }
        if !self
            .session
            .with(|state| state.is_printing && state.record_progress(progress))
        {
            return SendResult::Skipped("already reported".to_string());
        }

        debug!(storage, path, progress, "Progress step reached");
        let context = TemplateContext::new()
            .with("percentage", progress)
            .with("storage", storage)
            .with("path", path);
        let priority = self
            .rule_for(EventKind::Scheduled)
            .and_then(|scheduled| scheduled.priority);
        self.send_rule(EventKind::Progress, &rule, priority.as_ref(), &context)
    }

    /// 固件命令发送钩子
    pub fn on_command_sent(&self, command: &str, parsed_code: Option<&str>) -> Vec<SendResult> {
        self.on_command_sent_at(command, parsed_code, Utc::now())
    }

    /// 固件命令发送钩子，指定当前时间
    pub fn on_command_sent_at(
        &self,
        command: &str,
        parsed_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Vec<SendResult> {
        let intercepted = gcode::intercept(command, parsed_code);
        let mut results = Vec::new();

        if intercepted.ticks_clock() {
            if let Some(minute) = self.session.with(|state| state.advance_minute(now)) {
                if let Some(result) = self.check_schedule(minute) {
                    results.push(result);
                }
            }
        }

        match intercepted.action {
            CommandAction::FilamentChange => {
                results.push(self.on_event_at(EventKind::FilamentChange.as_str(), None, now));
            }
            CommandAction::SetPendingText(text) => {
                self.session.with(|state| state.set_pending_text(text));
            }
            CommandAction::Ignore => {}
        }
        results
    }

    /// minute 为步长的正整数倍时发送定时通知
    fn check_schedule(&self, minute: i64) -> Option<SendResult> {
        let rule = self.rule_for(EventKind::Scheduled)?;
        let divisor = rule.divisor()?;
        if minute <= 0 || minute % divisor != 0 || !self.session.with(|state| state.is_printing) {
            return None;
        }

        let context = TemplateContext::new().with("elapsed_time", minute);
        Some(self.send_rule(EventKind::Scheduled, &rule, rule.priority.as_ref(), &context))
    }

    /// 轮询一次温度，每个达到目标的加热器返回一个结果
    pub fn check_temperatures(&self) -> Vec<SendResult> {
        if !self.printer.is_operational() {
            return Vec::new();
        }
        let Some(rule) = self.rule_for(EventKind::TempReached).filter(EventRule::has_priority)
        else {
            return Vec::new();
        };

        let temperatures = self.printer.temperatures();
        let (bed_temp, bed_target) = temperatures.reading(Heater::Bed);
        let (e1_temp, e1_target) = temperatures.reading(Heater::Extruder);
        let context = TemplateContext::new()
            .with("bed_temp", format_reading(bed_temp))
            .with("bed_target", format_reading(bed_target))
            .with("e1_temp", format_reading(e1_temp))
            .with("e1_target", format_reading(e1_target));

        let mut results = Vec::new();
        for heater in Heater::ALL {
            let (actual, target) = temperatures.reading(heater);
            if target <= 0.0 || actual < target {
                continue;
            }
            // 检查和置位在同一把锁内完成
            if self.session.with(|state| state.claim_threshold(heater)) {
                debug!(heater = ?heater, actual, target, "Target temperature reached");
                results.push(self.send_rule(
                    EventKind::TempReached,
                    &rule,
                    rule.priority.as_ref(),
                    &context,
                ));
            }
        }
        results
    }

    /// 直接渲染规则模板并以给定优先级发送
    fn send_rule(
        &self,
        kind: EventKind,
        rule: &EventRule,
        priority: Option<&LooseInt>,
        context: &TemplateContext,
    ) -> SendResult {
        let Some(template) = rule.message.as_deref() else {
            debug!(event = %kind, "Rule has no message");
            return SendResult::Skipped("no message".to_string());
        };
        match render(template, context) {
            Ok(message) if !message.trim().is_empty() => {
                self.dispatcher.notify(message, priority, self.printer.as_ref())
            }
            Ok(_) => SendResult::Skipped("no message".to_string()),
            Err(e) => {
                warn!(event = %kind, error = %e, "Could not render message template");
                SendResult::Skipped(format!("template error: {}", e))
            }
        }
    }
}
