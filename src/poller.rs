//! 周期任务 - 重启时替换旧循环
//!
//! 每个 [`PeriodicTask`] 最多只有一个循环在运行：`restart` 在同一把锁内
//! 先中止旧循环再启动新循环。

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::state::lock_or_recover;

/// 默认温度轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

type Tick = Arc<dyn Fn() + Send + Sync>;

/// 后台周期任务
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    tick: Tick,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// 创建任务，不会立即启动
    pub fn new(name: &'static str, period: Duration, tick: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            name,
            period,
            tick: Arc::new(tick),
            handle: Mutex::new(None),
        }
    }

    /// 轮询间隔
    pub fn period(&self) -> Duration {
        self.period
    }

    /// 中止正在运行的循环并启动新的循环
    ///
    /// 不在 tokio 运行时中调用时返回 false，不会启动任何循环。
    pub fn restart(&self) -> bool {
        let mut handle = lock_or_recover(&self.handle);
        if let Some(previous) = handle.take() {
            previous.abort();
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(task = self.name, "No async runtime, periodic task not started");
                return false;
            }
        };

        let tick = Arc::clone(&self.tick);
        let period = self.period;
        *handle = Some(runtime.spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick();
            }
        }));
        debug!(task = self.name, period_ms = period.as_millis() as u64, "Periodic task started");
        true
    }

    /// 停止任务
    pub fn stop(&self) {
        if let Some(previous) = lock_or_recover(&self.handle).take() {
            previous.abort();
            debug!(task = self.name, "Periodic task stopped");
        }
    }

    /// 是否在运行
    pub fn is_running(&self) -> bool {
        lock_or_recover(&self.handle)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(previous) = lock_or_recover(&self.handle).take() {
            previous.abort();
        }
    }
}
