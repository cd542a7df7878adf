//! CLI 命令处理

pub mod config;
pub mod emit;
pub mod run;
pub mod test_message;

pub use config::*;
pub use emit::*;
pub use run::*;
pub use test_message::*;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::notification::{GotifyChannel, GotifyConfig};
use crate::settings::Settings;

/// 从 `path` 加载设置并应用 `GOTIFY_TOKEN` / `GOTIFY_URL`
pub fn load_settings(path: &Path) -> Result<Settings> {
    let mut settings = Settings::load(path)?;
    settings.apply_env_overrides();
    Ok(settings)
}

/// 为配置的服务器创建 Gotify 渠道
pub fn build_gotify(settings: &Settings) -> Result<Arc<GotifyChannel>> {
    let channel = GotifyChannel::new(GotifyConfig::from_settings(settings))?;
    Ok(Arc::new(channel))
}
