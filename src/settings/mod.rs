//! 设置存储 - 服务器地址、token 和事件规则
//!
//! 设置保存在 JSON 文件中。加载时把用户文件深度合并到内置默认值上，
//! 文件只需写出改动的键，也可以为没有处理函数的事件添加规则。

pub mod rules;

pub use rules::{default_rule, default_rules, emoji, EventRule, LooseInt};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::event::EventKind;

/// 覆盖 token 的环境变量
pub const TOKEN_ENV: &str = "GOTIFY_TOKEN";
/// 覆盖服务器地址的环境变量
pub const SERVER_URL_ENV: &str = "GOTIFY_URL";

/// 通知设置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Gotify 应用 token（仅管理员可见）
    #[serde(default)]
    pub token: Option<String>,
    /// Gotify 服务器地址，如 `https://push.example.com`
    #[serde(default)]
    pub gotify_server_base_url: Option<String>,
    /// 附带摄像头快照（由摄像头组件处理）
    #[serde(default = "default_image")]
    pub image: bool,
    /// 按事件名索引的规则
    #[serde(default = "default_rules")]
    pub events: BTreeMap<String, EventRule>,
}

fn default_image() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            gotify_server_base_url: None,
            image: default_image(),
            events: default_rules(),
        }
    }
}

impl Settings {
    /// 默认设置文件：`<config dir>/printer-notify/settings.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("printer-notify")
            .join("settings.json")
    }

    /// 从 `path` 加载设置，文件不存在时使用默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// 解析设置文档并合并到默认值上
    pub fn from_json_str(content: &str) -> Result<Self> {
        let overlay: Value = serde_json::from_str(content)?;
        let mut merged = serde_json::to_value(Self::default())?;
        merge_json(&mut merged, overlay);
        Ok(serde_json::from_value(merged)?)
    }

    /// 保存为格式化 JSON，自动创建父目录
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        info!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// 应用非空的 `GOTIFY_TOKEN` / `GOTIFY_URL`
    pub fn apply_env_overrides(&mut self) {
        if let Some(token) = non_empty_env(TOKEN_ENV) {
            self.token = Some(token);
        }
        if let Some(url) = non_empty_env(SERVER_URL_ENV) {
            self.gotify_server_base_url = Some(url);
        }
    }

    /// 按用户身份返回的设置，token 仅管理员可见
    pub fn view(&self, is_admin: bool) -> Settings {
        let mut view = self.clone();
        if !is_admin {
            view.token = None;
        }
        view
    }

    /// 按事件名查找规则，包括用户自定义事件
    pub fn rule(&self, event: &str) -> Option<&EventRule> {
        self.events.get(event)
    }

    /// 已知类型的规则
    pub fn rule_for(&self, kind: EventKind) -> Option<&EventRule> {
        self.events.get(kind.as_str())
    }

    /// 已知类型的可变规则，缺失时插入默认值
    pub fn rule_mut(&mut self, kind: EventKind) -> &mut EventRule {
        self.events
            .entry(kind.as_str().to_string())
            .or_insert_with(|| default_rule(kind))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// 递归合并 `overlay` 到 `base`，对象按键合并，其他值直接替换
fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
