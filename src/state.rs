//! 当前打印任务的会话状态
//!
//! 一个 `SessionState` 保存单个任务期间的全部状态。PrintStarted 整体重置，
//! PrintDone/PrintFailed 部分重置。主机回调、命令拦截和轮询都通过
//! [`SharedSession::with`] 访问，读改写都在同一把锁内完成。

use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::printer::Heater;

/// 获取互斥锁，前一个持有者 panic 时恢复数据
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 获取读锁，忽略中毒
pub(crate) fn read_or_recover<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 获取写锁，忽略中毒
pub(crate) fn write_or_recover<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 单个任务的状态
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// 是否正在打印
    pub is_printing: bool,
    /// PrintStarted 到达的时间
    pub start_time: Option<DateTime<Utc>>,
    /// 上次定时检查时的已用分钟数
    pub last_reported_minute: i64,
    /// 上次发送通知的进度百分比
    pub last_reported_progress: i64,
    /// 最近一次 M70/M117 的文本，直到被覆盖
    pub pending_command_text: String,
    /// 热床已发送过温度通知
    pub bed_threshold_notified: bool,
    /// 挤出头已发送过温度通知
    pub extruder_threshold_notified: bool,
    /// 首层通知尚未发送
    pub first_layer_pending: bool,
}

impl SessionState {
    /// 新任务开始，重置全部状态
    pub fn begin_job(&mut self, now: DateTime<Utc>) {
        *self = Self {
            is_printing: true,
            start_time: Some(now),
            first_layer_pending: true,
            ..Self::default()
        };
    }

    /// 任务完成，停止计时并清空计数
    pub fn finish_job(&mut self) {
        self.is_printing = false;
        self.start_time = None;
        self.last_reported_minute = 0;
        self.last_reported_progress = 0;
    }

    /// 任务失败，计数保留到下一个任务开始
    pub fn fail_job(&mut self) {
        self.is_printing = false;
    }

    /// 任务开始以来的整分钟数，四舍六入五取偶
    pub fn minutes_since_start(&self, now: DateTime<Utc>) -> Option<i64> {
        let start = self.start_time?;
        let seconds = (now - start).num_milliseconds() as f64 / 1000.0;
        Some((seconds / 60.0).round_ties_even() as i64)
    }

    /// 记录已用分钟数，只在变化时返回
    pub fn advance_minute(&mut self, now: DateTime<Utc>) -> Option<i64> {
        let minutes = self.minutes_since_start(now)?;
        if minutes == self.last_reported_minute {
            return None;
        }
        self.last_reported_minute = minutes;
        Some(minutes)
    }

    /// 记录进度，与上次相同时返回 false
    pub fn record_progress(&mut self, progress: i64) -> bool {
        if self.last_reported_progress == progress {
            return false;
        }
        self.last_reported_progress = progress;
        true
    }

    /// 认领加热器的温度通知，每个任务只成功一次
    pub fn claim_threshold(&mut self, heater: Heater) -> bool {
        let flag = match heater {
            Heater::Bed => &mut self.bed_threshold_notified,
            Heater::Extruder => &mut self.extruder_threshold_notified,
        };
        !std::mem::replace(flag, true)
    }

    /// 消费首层标志，每个任务只返回一次 true
    pub fn take_first_layer(&mut self) -> bool {
        std::mem::replace(&mut self.first_layer_pending, false)
    }

    /// 设置待附加文本
    pub fn set_pending_text(&mut self, text: impl Into<String>) {
        self.pending_command_text = text.into();
    }

    /// 加括号的待附加文本，没有时为空
    pub fn pending_text_wrapped(&self) -> String {
        if self.pending_command_text.is_empty() {
            String::new()
        } else {
            format!("({})", self.pending_command_text.trim())
        }
    }
}

/// [`SessionState`] 的唯一持有者
#[derive(Debug, Default)]
pub struct SharedSession {
    inner: Mutex<SessionState>,
}

impl SharedSession {
    /// 创建空会话
    pub fn new() -> Self {
        Self::default()
    }

    /// 独占访问状态并执行 `f`
    pub fn with<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = lock_or_recover(&self.inner);
        f(&mut state)
    }

    /// 当前状态的副本
    pub fn snapshot(&self) -> SessionState {
        lock_or_recover(&self.inner).clone()
    }
}
