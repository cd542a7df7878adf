//! Config 命令 - 查看和创建设置文件

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use super::load_settings;
use crate::settings::Settings;

/// Config 命令参数
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config 子命令
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// 以 JSON 输出生效的设置
    Show {
        /// 包含 token
        #[arg(long)]
        admin: bool,
    },
    /// 写入默认设置文件
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
    /// 输出设置文件路径
    Path,
}

/// 生效设置的格式化 JSON
pub fn render_settings(settings_path: &Path, admin: bool) -> Result<String> {
    let settings = load_settings(settings_path)?;
    Ok(serde_json::to_string_pretty(&settings.view(admin))?)
}

/// 把默认值写入 `settings_path`
pub fn init_settings(settings_path: &Path, force: bool) -> Result<()> {
    if settings_path.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite",
            settings_path.display()
        );
    }
    Settings::default().save(settings_path)
}

/// 处理 config 命令
pub fn handle_config(args: ConfigArgs, settings_path: &Path) -> Result<()> {
    match args.command {
        ConfigCommand::Show { admin } => {
            println!("{}", render_settings(settings_path, admin)?);
        }
        ConfigCommand::Init { force } => {
            init_settings(settings_path, force)?;
            println!("Settings written to {}", settings_path.display());
        }
        ConfigCommand::Path => {
            println!("{}", settings_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        init_settings(&path, false).unwrap();
        assert!(path.exists());
        assert!(init_settings(&path, false).is_err());
        init_settings(&path, true).unwrap();
    }

    #[test]
    fn test_show_hides_token_from_non_admin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"token": "secret-token"}"#).unwrap();

        let shown = render_settings(&path, false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&shown).unwrap();
        assert!(value["token"].is_null());
        assert!(value["events"]["PrintDone"]["message"].is_string());
    }
}
