//! 桥接模式 - 从 stdin 读取按行分隔的 JSON 驱动引擎
//!
//! 每行一条主机消息：
//! ```text
//! {"type":"event","name":"PrintStarted","payload":{"name":"benchy.gcode"}}
//! {"type":"progress","storage":"local","path":"benchy.gcode","progress":25}
//! {"type":"command","command":"M117 Layer 2","gcode":"M117"}
//! {"type":"printer","operational":true,"temperatures":{"bed":{"actual":60,"target":60}}}
//! {"type":"reload"}
//! ```

use anyhow::Result;
use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::{build_gotify, load_settings};
use crate::engine::NotifyEngine;
use crate::notification::{NotificationDispatcher, SendResult};
use crate::printer::{PrinterSnapshot, SharedPrinter};

/// Run 命令参数
#[derive(Args)]
pub struct RunArgs {
    /// 只打印载荷，不实际发送
    #[arg(long)]
    pub dry_run: bool,
}

/// 一行主机输入
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// 主机事件
    Event {
        name: String,
        #[serde(default)]
        payload: Option<Value>,
    },
    /// 打印进度
    Progress {
        #[serde(default)]
        storage: String,
        #[serde(default)]
        path: String,
        progress: i64,
    },
    /// 发往固件的命令
    Command {
        command: String,
        #[serde(default)]
        gcode: Option<String>,
    },
    /// 打印机状态快照
    Printer(PrinterSnapshot),
    /// 重新读取设置文件
    Reload,
}

/// 把一条主机消息交给引擎
pub fn apply_message(
    engine: &NotifyEngine,
    printer: &SharedPrinter,
    message: HostMessage,
    settings_path: &Path,
) -> Vec<SendResult> {
    match message {
        HostMessage::Event { name, payload } => vec![engine.on_event(&name, payload)],
        HostMessage::Progress {
            storage,
            path,
            progress,
        } => vec![engine.on_progress(&storage, &path, progress)],
        HostMessage::Command { command, gcode } => {
            engine.on_command_sent(&command, gcode.as_deref())
        }
        HostMessage::Printer(snapshot) => {
            printer.update(snapshot);
            Vec::new()
        }
        HostMessage::Reload => {
            match load_settings(settings_path) {
                Ok(settings) => engine.update_settings(settings),
                Err(e) => warn!(error = %e, "Could not reload settings, keeping current ones"),
            }
            Vec::new()
        }
    }
}

/// 处理 run 命令
pub async fn handle_run(args: RunArgs, settings_path: &Path) -> Result<()> {
    let settings = load_settings(settings_path)?;
    let gotify = build_gotify(&settings)?;
    let printer = Arc::new(SharedPrinter::default());
    let dispatcher = NotificationDispatcher::new()
        .with_dry_run(args.dry_run)
        .with_channel(gotify.clone());
    let engine = NotifyEngine::new(settings, printer.clone(), dispatcher);
    engine.start();

    info!(settings = %settings_path.display(), "Reading host messages from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<HostMessage>(&line) {
                    Ok(message) => {
                        let results = apply_message(&engine, &printer, message, settings_path);
                        debug!(results = ?results, "Host message handled");
                    }
                    Err(e) => warn!(error = %e, "Ignoring malformed host message"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    engine.shutdown();
    gotify.flush().await;
    info!("Bridge stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use serde_json::json;

    #[test]
    fn test_parse_host_messages() {
        let message: HostMessage = serde_json::from_str(
            r#"{"type":"event","name":"PrintDone","payload":{"name":"a.gcode","time":12}}"#,
        )
        .unwrap();
        assert_eq!(
            message,
            HostMessage::Event {
                name: "PrintDone".into(),
                payload: Some(json!({"name": "a.gcode", "time": 12})),
            }
        );

        let message: HostMessage =
            serde_json::from_str(r#"{"type":"command","command":"M600"}"#).unwrap();
        assert_eq!(
            message,
            HostMessage::Command {
                command: "M600".into(),
                gcode: None,
            }
        );

        let message: HostMessage = serde_json::from_str(
            r#"{"type":"printer","operational":true,"profile":"Ender 3"}"#,
        )
        .unwrap();
        match message {
            HostMessage::Printer(snapshot) => {
                assert!(snapshot.operational);
                assert_eq!(snapshot.profile.as_deref(), Some("Ender 3"));
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let message: HostMessage = serde_json::from_str(r#"{"type":"reload"}"#).unwrap();
        assert_eq!(message, HostMessage::Reload);
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        assert!(serde_json::from_str::<HostMessage>(r#"{"type":"nope"}"#).is_err());
    }

    #[test]
    fn test_apply_printer_snapshot() {
        let printer = Arc::new(SharedPrinter::default());
        let engine = NotifyEngine::new(
            Settings::default(),
            printer.clone(),
            NotificationDispatcher::new().with_dry_run(true),
        );

        let results = apply_message(
            &engine,
            &printer,
            HostMessage::Printer(PrinterSnapshot {
                operational: true,
                ..Default::default()
            }),
            Path::new("/nonexistent/settings.json"),
        );
        assert!(results.is_empty());
        assert!(printer.snapshot().operational);
    }

    #[test]
    fn test_apply_event_dry_run() {
        let printer = Arc::new(SharedPrinter::default());
        let engine = NotifyEngine::new(
            Settings::default(),
            printer.clone(),
            NotificationDispatcher::new().with_dry_run(true),
        );

        let results = apply_message(
            &engine,
            &printer,
            HostMessage::Event {
                name: "PrintStarted".into(),
                payload: None,
            },
            Path::new("/nonexistent/settings.json"),
        );
        assert_eq!(results, vec![SendResult::Skipped("dry-run".to_string())]);
        assert!(engine.session().is_printing);
    }
}
