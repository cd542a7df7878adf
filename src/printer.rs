//! 主机提供的打印机状态 - 是否可用、温度、配置名

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::state::{read_or_recover, write_or_recover};

/// 单个加热器读数（°C）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaterReading {
    #[serde(default)]
    pub actual: Option<f64>,
    #[serde(default)]
    pub target: Option<f64>,
}

impl HeaterReading {
    /// 创建读数
    pub fn new(actual: f64, target: f64) -> Self {
        Self {
            actual: Some(actual),
            target: Some(target),
        }
    }
}

/// 当前温度，缺失的加热器读作 0/0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    #[serde(default)]
    pub bed: Option<HeaterReading>,
    #[serde(default)]
    pub tool0: Option<HeaterReading>,
}

/// TempReached 通知监控的加热器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heater {
    Bed,
    Extruder,
}

impl Heater {
    /// 所有加热器
    pub const ALL: [Heater; 2] = [Heater::Bed, Heater::Extruder];
}

impl Temperatures {
    /// 加热器的 `(实际温度, 目标温度)`
    ///
    /// 实际温度取整到整数度，恰好 .5 时取偶数。
    pub fn reading(&self, heater: Heater) -> (f64, f64) {
        let reading = match heater {
            Heater::Bed => self.bed,
            Heater::Extruder => self.tool0,
        }
        .unwrap_or_default();
        (
            reading.actual.unwrap_or(0.0).round_ties_even(),
            reading.target.unwrap_or(0.0),
        )
    }
}

/// 引擎需要的打印机信息
pub trait PrinterState: Send + Sync {
    /// 已连接且可以接收命令
    fn is_operational(&self) -> bool;

    /// 当前温度
    fn temperatures(&self) -> Temperatures;

    /// 当前打印机配置的显示名
    fn profile_name(&self) -> Option<String>;
}

/// 主机上报的某一时刻的打印机状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrinterSnapshot {
    #[serde(default)]
    pub operational: bool,
    #[serde(default)]
    pub temperatures: Temperatures,
    #[serde(default)]
    pub profile: Option<String>,
}

/// 由主机快照更新的打印机状态
#[derive(Debug, Default)]
pub struct SharedPrinter {
    snapshot: RwLock<PrinterSnapshot>,
}

impl SharedPrinter {
    /// 用初始快照创建
    pub fn new(snapshot: PrinterSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// 替换当前快照
    pub fn update(&self, snapshot: PrinterSnapshot) {
        *write_or_recover(&self.snapshot) = snapshot;
    }

    /// 当前快照的副本
    pub fn snapshot(&self) -> PrinterSnapshot {
        read_or_recover(&self.snapshot).clone()
    }
}

impl PrinterState for SharedPrinter {
    fn is_operational(&self) -> bool {
        read_or_recover(&self.snapshot).operational
    }

    fn temperatures(&self) -> Temperatures {
        read_or_recover(&self.snapshot).temperatures.clone()
    }

    fn profile_name(&self) -> Option<String> {
        read_or_recover(&self.snapshot)
            .profile
            .clone()
            .filter(|name| !name.trim().is_empty())
    }
}

/// 未连接主机时的占位实现，永远不可用
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

impl PrinterState for Disconnected {
    fn is_operational(&self) -> bool {
        false
    }

    fn temperatures(&self) -> Temperatures {
        Temperatures::default()
    }

    fn profile_name(&self) -> Option<String> {
        None
    }
}
