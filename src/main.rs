//! Printer Notify CLI
//!
//! 把 3D 打印机主机事件推送到 Gotify 服务器

use anyhow::Result;
use clap::{Parser, Subcommand};
use printer_notify::cli::{
    handle_config, handle_emit, handle_run, handle_test, ConfigArgs, EmitArgs, RunArgs, TestArgs,
};
use printer_notify::Settings;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "pnotify")]
#[command(about = "Printer Notify - 推送 3D 打印机事件到 Gotify")]
#[command(version)]
struct Cli {
    /// 设置文件 (默认: <config dir>/printer-notify/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 从 stdin 读取主机消息 (NDJSON) 并发送通知
    Run(RunArgs),
    /// 发送单个事件
    Emit(EmitArgs),
    /// 发送测试通知
    Test(TestArgs),
    /// 查看或创建设置文件
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG 优先于 --verbose，如 RUST_LOG=printer_notify=trace pnotify run
    let default_filter = if cli.verbose {
        "printer_notify=debug,pnotify=debug"
    } else {
        "printer_notify=info,pnotify=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let settings_path = cli.config.unwrap_or_else(Settings::default_path);
    debug!(path = %settings_path.display(), "Using settings file");

    match cli.command {
        Commands::Run(args) => handle_run(args, &settings_path).await?,
        Commands::Emit(args) => handle_emit(args, &settings_path).await?,
        Commands::Test(args) => {
            if !handle_test(args, &settings_path).await? {
                std::process::exit(1);
            }
        }
        Commands::Config(args) => handle_config(args, &settings_path)?,
    }

    Ok(())
}
